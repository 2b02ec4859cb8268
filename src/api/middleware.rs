//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The JSON error type every handler returns
//! - Authentication (JWT bearer token validation)
//! - Authorization (admin role check)

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::db::repositories::{
    SqlxCollectionRepository, SqlxCommentRepository, SqlxContentRepository,
    SqlxInteractionRepository, SqlxIssueRepository, SqlxPostRepository,
    SqlxPrivateSnippetRepository, SqlxScoreRepository, SqlxSnippetRepository,
    SqlxSolutionRepository, SqlxStatsRepository, SqlxSubscriptionRepository,
    SqlxSuggestedPostRepository, SqlxTagRepository, SqlxTokenRepository, SqlxUserRepository,
    SqlxVoteRepository,
};
use crate::db::DbPool;
use crate::models::User;
use crate::services::{
    AdminService, AuthService, CollectionService, CommentService, EmailService,
    InteractionService, IssueService, JwtManager, LoginRateLimiter, OAuthClient, PostService,
    PrivateSnippetService, ScoreService, ServiceError, SnippetService, SolutionService,
    SubscriptionService, SuggestionService, TagService, UserService, VoteService,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub subscription_service: Arc<SubscriptionService>,
    pub score_service: Arc<ScoreService>,
    pub post_service: Arc<PostService>,
    pub snippet_service: Arc<SnippetService>,
    pub private_snippet_service: Arc<PrivateSnippetService>,
    pub issue_service: Arc<IssueService>,
    pub solution_service: Arc<SolutionService>,
    pub comment_service: Arc<CommentService>,
    pub vote_service: Arc<VoteService>,
    pub interaction_service: Arc<InteractionService>,
    pub tag_service: Arc<TagService>,
    pub collection_service: Arc<CollectionService>,
    pub suggestion_service: Arc<SuggestionService>,
    pub admin_service: Arc<AdminService>,
    pub rate_limiter: Arc<LoginRateLimiter>,
}

impl AppState {
    /// Wire every repository and service on top of one pool
    pub fn new(pool: DbPool, config: &Config, oauth_client: Arc<dyn OAuthClient>) -> Self {
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let subscription_repo = SqlxSubscriptionRepository::boxed(pool.clone());
        let issue_repo = SqlxIssueRepository::boxed(pool.clone());
        let content_repo = SqlxContentRepository::boxed(pool.clone());

        let email = Arc::new(EmailService::new(
            config.smtp.clone(),
            config.auth.frontend_url.clone(),
        ));
        let auth_service = Arc::new(AuthService::new(
            user_repo.clone(),
            SqlxTokenRepository::boxed(pool.clone()),
            email,
            JwtManager::from_config(&config.auth),
            config.oauth.clone(),
            oauth_client,
        ));

        let score_service = Arc::new(ScoreService::new(
            SqlxScoreRepository::boxed(pool.clone()),
            user_repo.clone(),
        ));
        let tag_service = Arc::new(TagService::new(
            SqlxTagRepository::boxed(pool.clone()),
            content_repo.clone(),
        ));
        let post_service = Arc::new(PostService::new(
            SqlxPostRepository::boxed(pool.clone()),
            tag_service.clone(),
        ));
        let snippet_service = Arc::new(SnippetService::new(
            SqlxSnippetRepository::boxed(pool.clone()),
            tag_service.clone(),
        ));
        let issue_service = Arc::new(IssueService::new(
            issue_repo.clone(),
            tag_service.clone(),
            score_service.clone(),
        ));
        let solution_service = Arc::new(SolutionService::new(
            SqlxSolutionRepository::boxed(pool.clone()),
            issue_repo,
            score_service.clone(),
        ));
        let comment_service = Arc::new(CommentService::new(
            SqlxCommentRepository::boxed(pool.clone()),
            score_service.clone(),
        ));
        let admin_service = Arc::new(AdminService::new(
            SqlxStatsRepository::boxed(pool.clone()),
            user_repo.clone(),
            score_service.clone(),
            post_service.clone(),
            snippet_service.clone(),
            issue_service.clone(),
            solution_service.clone(),
            comment_service.clone(),
        ));

        Self {
            auth_service,
            user_service: Arc::new(UserService::new(user_repo.clone(), subscription_repo.clone())),
            subscription_service: Arc::new(SubscriptionService::new(
                subscription_repo,
                user_repo.clone(),
            )),
            score_service,
            post_service,
            snippet_service,
            private_snippet_service: Arc::new(PrivateSnippetService::new(
                SqlxPrivateSnippetRepository::boxed(pool.clone()),
            )),
            issue_service,
            solution_service,
            comment_service,
            vote_service: Arc::new(VoteService::new(SqlxVoteRepository::boxed(pool.clone()))),
            interaction_service: Arc::new(InteractionService::new(
                SqlxInteractionRepository::boxed(pool.clone()),
            )),
            tag_service,
            collection_service: Arc::new(CollectionService::new(
                SqlxCollectionRepository::boxed(pool.clone()),
                user_repo,
                content_repo,
            )),
            suggestion_service: Arc::new(SuggestionService::new(
                SqlxSuggestedPostRepository::boxed(pool.clone()),
            )),
            admin_service,
            rate_limiter: Arc::new(LoginRateLimiter::new()),
            pool,
        }
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// The caller if a valid token was sent, for routes that also serve anonymous users
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "RATE_LIMIT" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(msg) => ApiError::not_found(msg),
            ServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            ServiceError::Unauthorized(msg) => ApiError::unauthorized(msg),
            ServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ServiceError::Conflict(msg) => ApiError::conflict(msg),
            ServiceError::InternalError(e) => {
                // Details stay in the log, not in the response
                tracing::error!("Internal error: {:#}", e);
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Extract the bearer token from the Authorization header
fn extract_bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state.auth_service.authenticate(&token).await?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Optional authentication middleware. Bad tokens are treated as anonymous.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_bearer_token(&request) {
        if let Ok(user) = state.auth_service.authenticate(&token).await {
            request.extensions_mut().insert(AuthenticatedUser(user));
        }
    }
    next.run(request).await
}

/// Admin authorization middleware
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !user.0.is_admin() {
        return Err(ApiError::forbidden("Admin privileges required"));
    }

    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .map(|au| au.0.clone()),
        ))
    }
}
