//! Post API endpoints
//!
//! - GET    /api/v1/posts?author=&tag=&page=&per_page=
//! - GET    /api/v1/posts/{id}        (counts a view)
//! - POST   /api/v1/posts             (auth)
//! - PUT    /api/v1/posts/{id}        (auth, author or admin)
//! - DELETE /api/v1/posts/{id}        (auth, author or admin)

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
use crate::models::{CreatePostInput, ListParams, PagedResult, Post, PostFilter, UpdatePostInput};

#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub author: Option<String>,
    pub tag: Option<String>,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts))
        .route("/posts/{id}", get(get_post))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/posts", post(create_post))
        .route("/posts/{id}", put(update_post).delete(delete_post))
}

async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<PagedResult<Post>>, ApiError> {
    let filter = PostFilter {
        author_id: resolve_author(&state, query.author.as_deref()).await?,
        tag: query.tag,
    };
    let params = ListParams::new(query.page, query.per_page);
    Ok(Json(state.post_service.list(filter, &params).await?))
}

async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Post>, ApiError> {
    Ok(Json(state.post_service.view(id).await?))
}

async fn create_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreatePostInput>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.post_service.create(&user.0, body).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePostInput>,
) -> Result<Json<Post>, ApiError> {
    Ok(Json(state.post_service.update(&user.0, id, body).await?))
}

async fn delete_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.post_service.delete(&user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
