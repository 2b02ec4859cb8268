//! Admin API endpoints (admin role required)
//!
//! - GET    /api/v1/admin/stats
//! - GET    /api/v1/admin/users?search=&page=&per_page=
//! - PUT    /api/v1/admin/users/{id}/role
//! - DELETE /api/v1/admin/users/{id}           (soft delete)
//! - POST   /api/v1/admin/users/{id}/restore
//! - POST   /api/v1/admin/users/{id}/score     (recompute reputation)
//! - DELETE /api/v1/admin/content/{kind}/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{default_page, default_per_page, parse_kind};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::db::repositories::PlatformStats;
use crate::models::{ListParams, PagedResult, User, UserRole};
use crate::services::ModeratedContent;

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub user_id: i64,
    pub score: i64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/users", get(list_users))
        .route("/users/{id}", delete(delete_user))
        .route("/users/{id}/role", put(set_role))
        .route("/users/{id}/restore", post(restore_user))
        .route("/users/{id}/score", post(recompute_score))
        .route("/content/{kind}/{id}", delete(delete_content))
}

async fn get_stats(State(state): State<AppState>) -> Result<Json<PlatformStats>, ApiError> {
    Ok(Json(state.admin_service.stats().await?))
}

async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<PagedResult<User>>, ApiError> {
    let params = ListParams::new(query.page, query.per_page);
    Ok(Json(
        state
            .user_service
            .list_users(query.search.as_deref(), &params)
            .await?,
    ))
}

async fn set_role(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<SetRoleRequest>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.user_service.set_role(&admin.0, id, body.role).await?))
}

async fn delete_user(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.user_service.set_deleted(&admin.0, id, true).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn restore_user(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.user_service.set_deleted(&admin.0, id, false).await?))
}

async fn recompute_score(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ScoreResponse>, ApiError> {
    let score = state.admin_service.recompute_score(id).await?;
    Ok(Json(ScoreResponse { user_id: id, score }))
}

async fn delete_content(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    Path((kind, id)): Path<(String, i64)>,
) -> Result<StatusCode, ApiError> {
    let kind = parse_kind::<ModeratedContent>(&kind)?;
    state.admin_service.delete_content(&admin.0, kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
