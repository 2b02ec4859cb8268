//! Like/dislike voting on issues and solutions (auth required)
//!
//! - POST /api/v1/votes
//! - GET  /api/v1/votes/{target_type}/{target_id}

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::parse_kind;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{VoteResult, VoteTarget};

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub target_type: VoteTarget,
    pub target_id: i64,
    #[serde(default)]
    pub is_dislike: bool,
}

/// The caller's current vote; `is_dislike` is absent when there is none
#[derive(Debug, Serialize)]
pub struct MyVoteResponse {
    pub voted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_dislike: Option<bool>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/votes", post(cast_vote))
        .route("/votes/{target_type}/{target_id}", get(my_vote))
}

/// Voting the same way twice removes the vote; voting the other way flips it
async fn cast_vote(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<VoteRequest>,
) -> Result<Json<VoteResult>, ApiError> {
    Ok(Json(
        state
            .vote_service
            .vote(&user.0, body.target_type, body.target_id, body.is_dislike)
            .await?,
    ))
}

async fn my_vote(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((target_type, target_id)): Path<(String, i64)>,
) -> Result<Json<MyVoteResponse>, ApiError> {
    let target = parse_kind::<VoteTarget>(&target_type)?;
    let is_dislike = state.vote_service.my_vote(&user.0, target, target_id).await?;
    Ok(Json(MyVoteResponse {
        voted: is_dislike.is_some(),
        is_dislike,
    }))
}
