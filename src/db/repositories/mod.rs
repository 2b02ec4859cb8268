//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the queries for one entity (or one closely
//! related group of tables).

pub mod collection;
pub mod comment;
pub mod interaction;
pub mod issue;
pub mod post;
pub mod private_snippet;
pub mod score;
pub mod snippet;
pub mod solution;
pub mod stats;
pub mod subscription;
pub mod suggested_post;
pub mod tag;
pub mod target;
pub mod token;
pub mod user;
pub mod vote;

pub use collection::{CollectionRepository, SqlxCollectionRepository};
pub use comment::{CommentInsert, CommentRepository, SqlxCommentRepository};
pub use interaction::{InteractionRepository, SqlxInteractionRepository};
pub use issue::{IssueFields, IssueRepository, SqlxIssueRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use private_snippet::{PrivateSnippetRepository, SqlxPrivateSnippetRepository};
pub use score::{ScoreRepository, SqlxScoreRepository};
pub use snippet::{SnippetFields, SnippetRepository, SqlxSnippetRepository};
pub use solution::{SolutionInsert, SolutionRepository, SqlxSolutionRepository};
pub use stats::{PlatformStats, SqlxStatsRepository, StatsRepository};
pub use subscription::{SqlxSubscriptionRepository, SubscriptionRepository};
pub use suggested_post::{CandidateSignals, SqlxSuggestedPostRepository, SuggestedPostRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use target::{ContentRepository, SqlxContentRepository};
pub use token::{SqlxTokenRepository, TokenRepository};
pub use user::{ProviderColumn, SqlxUserRepository, UserRepository};
pub use vote::{SqlxVoteRepository, VoteRepository};
