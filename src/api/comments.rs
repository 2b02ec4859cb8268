//! Comment API endpoints
//!
//! - GET    /api/v1/comments?target_type=&target_id=   (reply tree)
//! - POST   /api/v1/comments                           (auth)
//! - PUT    /api/v1/comments/{id}                      (auth, author)
//! - DELETE /api/v1/comments/{id}                      (auth, author or admin)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::parse_kind;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Comment, CommentNode, CommentTarget, CreateCommentInput};

#[derive(Debug, Deserialize)]
pub struct CommentsQuery {
    pub target_type: String,
    pub target_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/comments", get(list_comments))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/comments", post(create_comment))
        .route("/comments/{id}", put(update_comment).delete(delete_comment))
}

async fn list_comments(
    State(state): State<AppState>,
    Query(query): Query<CommentsQuery>,
) -> Result<Json<Vec<CommentNode>>, ApiError> {
    let target = parse_kind::<CommentTarget>(&query.target_type)?;
    Ok(Json(
        state
            .comment_service
            .list_tree(target, query.target_id)
            .await?,
    ))
}

async fn create_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateCommentInput>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state.comment_service.create(&user.0, body).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn update_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateCommentRequest>,
) -> Result<Json<Comment>, ApiError> {
    Ok(Json(
        state
            .comment_service
            .update(&user.0, id, &body.content)
            .await?,
    ))
}

async fn delete_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.comment_service.delete(&user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
