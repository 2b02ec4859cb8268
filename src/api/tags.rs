//! Tag API endpoints
//!
//! Tags belong to the user who created them. Content can also be tagged
//! through the `tags` field of the create and update bodies.
//!
//! - GET    /api/v1/tags                 (auth, own tags with usage counts)
//! - POST   /api/v1/tags                 (auth)
//! - PUT    /api/v1/tags/{id}            (auth, owner)
//! - DELETE /api/v1/tags/{id}            (auth, owner)
//! - POST   /api/v1/tags/{id}/attach     (auth)
//! - POST   /api/v1/tags/{id}/detach     (auth)
//! - GET    /api/v1/tags/{id}/content

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{CreateTagInput, Tag, TagWithCount, TaggedContent, UpdateTagInput};

pub fn public_router() -> Router<AppState> {
    Router::new().route("/tags/{id}/content", get(list_content))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/tags", get(list_tags).post(create_tag))
        .route("/tags/{id}", put(update_tag).delete(delete_tag))
        .route("/tags/{id}/attach", post(attach_tag))
        .route("/tags/{id}/detach", post(detach_tag))
}

async fn list_tags(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<TagWithCount>>, ApiError> {
    Ok(Json(state.tag_service.list_mine(&user.0).await?))
}

async fn create_tag(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateTagInput>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = state.tag_service.create(&user.0, body).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

async fn update_tag(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateTagInput>,
) -> Result<Json<Tag>, ApiError> {
    Ok(Json(state.tag_service.update(&user.0, id, body).await?))
}

async fn delete_tag(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.tag_service.delete(&user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn attach_tag(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<TaggedContent>,
) -> Result<StatusCode, ApiError> {
    state.tag_service.attach(&user.0, id, body).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn detach_tag(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<TaggedContent>,
) -> Result<StatusCode, ApiError> {
    state.tag_service.detach(&user.0, id, body).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_content(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<TaggedContent>>, ApiError> {
    Ok(Json(state.tag_service.list_content(id).await?))
}
