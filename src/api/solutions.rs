//! Solution endpoints. Creation and listing live under `/issues/{id}`.
//!
//! - GET    /api/v1/solutions/{id}
//! - PUT    /api/v1/solutions/{id}          (auth, author)
//! - DELETE /api/v1/solutions/{id}          (auth, author or admin)
//! - POST   /api/v1/solutions/{id}/accept   (auth, issue author)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Solution, UpdateSolutionInput};

pub fn public_router() -> Router<AppState> {
    Router::new().route("/solutions/{id}", get(get_solution))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/solutions/{id}", put(update_solution).delete(delete_solution))
        .route("/solutions/{id}/accept", post(accept_solution))
}

async fn get_solution(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Solution>, ApiError> {
    Ok(Json(state.solution_service.get(id).await?))
}

async fn update_solution(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateSolutionInput>,
) -> Result<Json<Solution>, ApiError> {
    Ok(Json(state.solution_service.update(&user.0, id, body).await?))
}

async fn delete_solution(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.solution_service.delete(&user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Accepting a solution marks its issue resolved
async fn accept_solution(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Solution>, ApiError> {
    Ok(Json(state.solution_service.accept(&user.0, id).await?))
}
