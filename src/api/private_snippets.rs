//! Private snippet endpoints. Everything here requires auth and only ever
//! touches the caller's own snippets.
//!
//! - GET    /api/v1/private-snippets
//! - POST   /api/v1/private-snippets
//! - GET    /api/v1/private-snippets/{id}
//! - PUT    /api/v1/private-snippets/{id}
//! - DELETE /api/v1/private-snippets/{id}
//! - GET    /api/v1/private-snippets/{id}/versions
//! - GET    /api/v1/private-snippets/{id}/versions/{version}
//! - POST   /api/v1/private-snippets/{id}/versions/{version}/restore

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{
    CreatePrivateSnippetInput, PagedResult, PrivateSnippet, PrivateSnippetVersion,
    UpdatePrivateSnippetInput,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/private-snippets", get(list).post(create))
        .route(
            "/private-snippets/{id}",
            get(get_one).put(update).delete(delete),
        )
        .route("/private-snippets/{id}/versions", get(versions))
        .route("/private-snippets/{id}/versions/{version}", get(version))
        .route(
            "/private-snippets/{id}/versions/{version}/restore",
            post(restore),
        )
}

async fn list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<PagedResult<PrivateSnippet>>, ApiError> {
    Ok(Json(
        state
            .private_snippet_service
            .list(&user.0, &page.params())
            .await?,
    ))
}

async fn create(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreatePrivateSnippetInput>,
) -> Result<impl IntoResponse, ApiError> {
    let snippet = state.private_snippet_service.create(&user.0, body).await?;
    Ok((StatusCode::CREATED, Json(snippet)))
}

async fn get_one(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<PrivateSnippet>, ApiError> {
    Ok(Json(state.private_snippet_service.get(&user.0, id).await?))
}

async fn update(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePrivateSnippetInput>,
) -> Result<Json<PrivateSnippet>, ApiError> {
    Ok(Json(
        state
            .private_snippet_service
            .update(&user.0, id, body)
            .await?,
    ))
}

async fn delete(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.private_snippet_service.delete(&user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn versions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<PrivateSnippetVersion>>, ApiError> {
    Ok(Json(state.private_snippet_service.versions(&user.0, id).await?))
}

async fn version(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((id, version)): Path<(i64, i64)>,
) -> Result<Json<PrivateSnippetVersion>, ApiError> {
    Ok(Json(
        state
            .private_snippet_service
            .version(&user.0, id, version)
            .await?,
    ))
}

async fn restore(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((id, version)): Path<(i64, i64)>,
) -> Result<Json<PrivateSnippet>, ApiError> {
    Ok(Json(
        state
            .private_snippet_service
            .restore(&user.0, id, version)
            .await?,
    ))
}
