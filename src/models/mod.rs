//! Data models
//!
//! Database entities, API input types and the small pure helpers that go
//! with them (reaction tallies, vote deltas, comment trees, score weights).

mod collection;
mod comment;
mod interaction;
mod issue;
mod pagination;
mod post;
mod score;
mod snippet;
mod social;
mod tag;
mod target;
mod token;
mod user;
mod vote;

pub use collection::{
    AddCollaboratorInput, AddItemInput, Collaborator, CollaboratorRole, Collection,
    CollectionAccess, CollectionItem, CreateCollectionInput, UpdateCollectionInput,
};
pub use comment::{build_comment_tree, Comment, CommentNode, CreateCommentInput};
pub use interaction::{
    plan_reaction, Interaction, ReactionResult, ReactionSummary, ReactionTally, ReactionType,
};
pub use issue::{
    CreateIssueInput, CreateSolutionInput, Issue, IssueFilter, IssueStatus, Solution,
    UpdateIssueInput, UpdateSolutionInput,
};
pub use pagination::{ListParams, PagedResult};
pub use post::{CreatePostInput, Post, PostFilter, UpdatePostInput};
pub use score::{Contributions, LeaderboardEntry};
pub use snippet::{
    CreatePrivateSnippetInput, CreateSnippetInput, PrivateSnippet, PrivateSnippetVersion,
    Snippet, SnippetFilter, UpdatePrivateSnippetInput, UpdateSnippetInput,
};
pub use social::{Subscription, SuggestedPost, SuggestionCandidate};
pub use tag::{
    is_valid_color, normalize_tag_name, CreateTagInput, Tag, TagWithCount, TaggedContent,
    UpdateTagInput, MAX_TAG_NAME_LEN,
};
pub use target::{CommentTarget, ContentType, ReactionTarget, VoteTarget};
pub use token::{EmailVerification, PasswordReset};
pub use user::{PublicProfile, UpdateProfileInput, User, UserRole, UserSummary};
pub use vote::{ToggleOutcome, Vote, VoteDelta, VoteResult};
