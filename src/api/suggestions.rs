//! Suggested posts for the current user (auth required)
//!
//! - GET  /api/v1/suggestions
//! - POST /api/v1/suggestions/refresh
//! - POST /api/v1/suggestions/{id}/dismiss

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{PagedResult, SuggestedPost};

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub suggested: usize,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/suggestions", get(list_suggestions))
        .route("/suggestions/refresh", post(refresh_suggestions))
        .route("/suggestions/{id}/dismiss", post(dismiss_suggestion))
}

async fn list_suggestions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<PagedResult<SuggestedPost>>, ApiError> {
    Ok(Json(
        state
            .suggestion_service
            .list(&user.0, &page.params())
            .await?,
    ))
}

async fn refresh_suggestions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<RefreshResponse>, ApiError> {
    let suggested = state.suggestion_service.refresh(&user.0).await?;
    Ok(Json(RefreshResponse { suggested }))
}

async fn dismiss_suggestion(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.suggestion_service.dismiss(&user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
