//! Emoji reactions on posts and snippets
//!
//! - GET  /api/v1/reactions/{target_type}/{target_id}      (optional auth)
//! - GET  /api/v1/reactions/{target_type}/{target_id}/me   (auth)
//! - POST /api/v1/reactions                                (auth)

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::parse_kind;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};
use crate::models::{ReactionResult, ReactionSummary, ReactionTarget, ReactionType};

#[derive(Debug, Deserialize)]
pub struct ReactRequest {
    pub target_type: ReactionTarget,
    pub target_id: i64,
    pub reaction_type: ReactionType,
}

#[derive(Debug, Serialize)]
pub struct MyReactionResponse {
    pub reaction_type: Option<ReactionType>,
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/reactions/{target_type}/{target_id}", get(summary))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/reactions", post(react))
        .route("/reactions/{target_type}/{target_id}/me", get(my_reaction))
}

/// Same reaction twice removes it, a different one replaces it
async fn react(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ReactRequest>,
) -> Result<Json<ReactionResult>, ApiError> {
    Ok(Json(
        state
            .interaction_service
            .react(&user.0, body.target_type, body.target_id, body.reaction_type)
            .await?,
    ))
}

async fn summary(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path((target_type, target_id)): Path<(String, i64)>,
) -> Result<Json<ReactionSummary>, ApiError> {
    let target = parse_kind::<ReactionTarget>(&target_type)?;
    Ok(Json(
        state
            .interaction_service
            .summary(viewer.0.as_ref(), target, target_id)
            .await?,
    ))
}

async fn my_reaction(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((target_type, target_id)): Path<(String, i64)>,
) -> Result<Json<MyReactionResponse>, ApiError> {
    let target = parse_kind::<ReactionTarget>(&target_type)?;
    let reaction_type = state
        .interaction_service
        .my_reaction(&user.0, target, target_id)
        .await?;
    Ok(Json(MyReactionResponse { reaction_type }))
}
