//! Issue API endpoints
//!
//! - GET    /api/v1/issues?status=&author=&tag=
//! - GET    /api/v1/issues/{id}
//! - GET    /api/v1/issues/{id}/solutions
//! - POST   /api/v1/issues                  (auth)
//! - PUT    /api/v1/issues/{id}             (auth, author)
//! - DELETE /api/v1/issues/{id}             (auth, author or admin)
//! - POST   /api/v1/issues/{id}/close       (auth, author)
//! - POST   /api/v1/issues/{id}/solutions   (auth)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{default_page, default_per_page, parse_kind, resolve_author};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{
    CreateIssueInput, CreateSolutionInput, Issue, IssueFilter, IssueStatus, ListParams,
    PagedResult, Solution, UpdateIssueInput,
};

#[derive(Debug, Deserialize)]
pub struct ListIssuesQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub status: Option<String>,
    pub author: Option<String>,
    pub tag: Option<String>,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/issues", get(list_issues))
        .route("/issues/{id}", get(get_issue))
        .route("/issues/{id}/solutions", get(list_solutions))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/issues", post(create_issue))
        .route("/issues/{id}", put(update_issue).delete(delete_issue))
        .route("/issues/{id}/close", post(close_issue))
        .route("/issues/{id}/solutions", post(create_solution))
}

async fn list_issues(
    State(state): State<AppState>,
    Query(query): Query<ListIssuesQuery>,
) -> Result<Json<PagedResult<Issue>>, ApiError> {
    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(parse_kind::<IssueStatus>(raw)?),
        None => None,
    };
    let filter = IssueFilter {
        status,
        author_id: resolve_author(&state, query.author.as_deref()).await?,
        tag: query.tag,
    };
    let params = ListParams::new(query.page, query.per_page);
    Ok(Json(state.issue_service.list(filter, &params).await?))
}

async fn get_issue(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Issue>, ApiError> {
    Ok(Json(state.issue_service.get(id).await?))
}

async fn list_solutions(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Solution>>, ApiError> {
    Ok(Json(state.solution_service.list_for_issue(id).await?))
}

async fn create_issue(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateIssueInput>,
) -> Result<impl IntoResponse, ApiError> {
    let issue = state.issue_service.create(&user.0, body).await?;
    Ok((StatusCode::CREATED, Json(issue)))
}

async fn update_issue(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateIssueInput>,
) -> Result<Json<Issue>, ApiError> {
    Ok(Json(state.issue_service.update(&user.0, id, body).await?))
}

async fn delete_issue(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.issue_service.delete(&user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn close_issue(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Issue>, ApiError> {
    Ok(Json(state.issue_service.close(&user.0, id).await?))
}

async fn create_solution(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<CreateSolutionInput>,
) -> Result<impl IntoResponse, ApiError> {
    let solution = state.solution_service.create(&user.0, id, body).await?;
    Ok((StatusCode::CREATED, Json(solution)))
}
