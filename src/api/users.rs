//! User, profile and follow endpoints
//!
//! - GET    /api/v1/users/leaderboard?limit=
//! - GET    /api/v1/users/{username}
//! - GET    /api/v1/users/{username}/posts|snippets|issues
//! - GET    /api/v1/users/{username}/followers|following
//! - GET    /api/v1/users/{username}/follow        (auth)
//! - POST   /api/v1/users/{username}/follow        (auth)
//! - DELETE /api/v1/users/{username}/follow        (auth)
//! - GET    /api/v1/profile                        (auth)
//! - PUT    /api/v1/profile                        (auth)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{
    Issue, IssueFilter, LeaderboardEntry, PagedResult, Post, PostFilter, PublicProfile, Snippet,
    SnippetFilter, UpdateProfileInput, User, UserSummary,
};

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct FollowStatus {
    pub following: bool,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/users/leaderboard", get(leaderboard))
        .route("/users/{username}", get(get_profile))
        .route("/users/{username}/posts", get(list_user_posts))
        .route("/users/{username}/snippets", get(list_user_snippets))
        .route("/users/{username}/issues", get(list_user_issues))
        .route("/users/{username}/followers", get(followers))
        .route("/users/{username}/following", get(following))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(my_profile).put(update_profile))
        .route(
            "/users/{username}/follow",
            get(follow_status).post(follow).delete(unfollow),
        )
}

async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    Ok(Json(state.score_service.leaderboard(query.limit).await?))
}

async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<PublicProfile>, ApiError> {
    Ok(Json(state.user_service.get_profile(&username).await?))
}

async fn list_user_posts(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<PagedResult<Post>>, ApiError> {
    let author = state.user_service.find_by_username(&username).await?;
    let filter = PostFilter {
        author_id: Some(author.id),
        ..Default::default()
    };
    Ok(Json(state.post_service.list(filter, &page.params()).await?))
}

async fn list_user_snippets(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<PagedResult<Snippet>>, ApiError> {
    let author = state.user_service.find_by_username(&username).await?;
    let filter = SnippetFilter {
        author_id: Some(author.id),
        ..Default::default()
    };
    Ok(Json(state.snippet_service.list(filter, &page.params()).await?))
}

async fn list_user_issues(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<PagedResult<Issue>>, ApiError> {
    let author = state.user_service.find_by_username(&username).await?;
    let filter = IssueFilter {
        author_id: Some(author.id),
        ..Default::default()
    };
    Ok(Json(state.issue_service.list(filter, &page.params()).await?))
}

async fn followers(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<PagedResult<UserSummary>>, ApiError> {
    Ok(Json(
        state
            .subscription_service
            .followers(&username, &page.params())
            .await?,
    ))
}

async fn following(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<PagedResult<UserSummary>>, ApiError> {
    Ok(Json(
        state
            .subscription_service
            .following(&username, &page.params())
            .await?,
    ))
}

async fn follow_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(username): Path<String>,
) -> Result<Json<FollowStatus>, ApiError> {
    let following = state
        .subscription_service
        .is_following(&user.0, &username)
        .await?;
    Ok(Json(FollowStatus { following }))
}

async fn follow(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(username): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.subscription_service.follow(&user.0, &username).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn unfollow(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(username): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.subscription_service.unfollow(&user.0, &username).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Own profile, including email and verification state
async fn my_profile(user: AuthenticatedUser) -> Json<User> {
    Json(user.0)
}

async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<UpdateProfileInput>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.user_service.update_profile(&user.0, body).await?))
}
