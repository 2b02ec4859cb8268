//! Services layer - Business logic
//!
//! Services validate input, enforce ownership and role rules, and coordinate
//! repositories. They return [`ServiceResult`]; the API layer maps
//! [`ServiceError`] onto HTTP responses.

pub mod admin;
pub mod auth;
pub mod collection;
pub mod comment;
pub mod email;
pub mod error;
pub mod interaction;
pub mod issue;
pub mod oauth;
pub mod password;
pub mod post;
pub mod private_snippet;
pub mod rate_limiter;
pub mod score;
pub mod snippet;
pub mod solution;
pub mod subscription;
pub mod suggestion;
pub mod tag;
pub mod token;
pub mod user;
pub mod vote;

pub use admin::{AdminService, ModeratedContent};
pub use auth::{AuthResponse, AuthService, LoginInput, RegisterInput};
pub use collection::CollectionService;
pub use comment::CommentService;
pub use email::EmailService;
pub use error::{ServiceError, ServiceResult};
pub use interaction::InteractionService;
pub use issue::IssueService;
pub use oauth::{HttpOAuthClient, OAuthClient, OAuthProfile, OAuthProvider};
pub use password::{hash_password, verify_password};
pub use post::PostService;
pub use private_snippet::PrivateSnippetService;
pub use rate_limiter::LoginRateLimiter;
pub use score::ScoreService;
pub use snippet::SnippetService;
pub use solution::SolutionService;
pub use subscription::SubscriptionService;
pub use suggestion::SuggestionService;
pub use tag::TagService;
pub use token::{Claims, JwtManager};
pub use user::UserService;
pub use vote::VoteService;
