//! Public snippet API endpoints
//!
//! - GET    /api/v1/snippets?author=&language=&tag=
//! - GET    /api/v1/snippets/{id}
//! - POST   /api/v1/snippets          (auth)
//! - PUT    /api/v1/snippets/{id}     (auth)
//! - DELETE /api/v1/snippets/{id}     (auth)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{default_page, default_per_page, resolve_author};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{
    CreateSnippetInput, ListParams, PagedResult, Snippet, SnippetFilter, UpdateSnippetInput,
};

#[derive(Debug, Deserialize)]
pub struct ListSnippetsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub author: Option<String>,
    pub language: Option<String>,
    pub tag: Option<String>,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/snippets", get(list_snippets))
        .route("/snippets/{id}", get(get_snippet))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/snippets", post(create_snippet))
        .route("/snippets/{id}", put(update_snippet).delete(delete_snippet))
}

async fn list_snippets(
    State(state): State<AppState>,
    Query(query): Query<ListSnippetsQuery>,
) -> Result<Json<PagedResult<Snippet>>, ApiError> {
    let filter = SnippetFilter {
        author_id: resolve_author(&state, query.author.as_deref()).await?,
        language: query.language,
        tag: query.tag,
    };
    let params = ListParams::new(query.page, query.per_page);
    Ok(Json(state.snippet_service.list(filter, &params).await?))
}

async fn get_snippet(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Snippet>, ApiError> {
    Ok(Json(state.snippet_service.get(id).await?))
}

async fn create_snippet(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateSnippetInput>,
) -> Result<impl IntoResponse, ApiError> {
    let snippet = state.snippet_service.create(&user.0, body).await?;
    Ok((StatusCode::CREATED, Json(snippet)))
}

async fn update_snippet(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateSnippetInput>,
) -> Result<Json<Snippet>, ApiError> {
    Ok(Json(state.snippet_service.update(&user.0, id, body).await?))
}

async fn delete_snippet(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.snippet_service.delete(&user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
