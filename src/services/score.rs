//! Contributor score
//!
//! The score is derived from a user's non-deleted contributions and cached on
//! the user row. Content services call [`ScoreService::schedule`] after each
//! event that can change it; the recompute runs in the background and its
//! failures are only logged, so the stored value is eventually consistent.

use crate::db::repositories::{ScoreRepository, UserRepository};
use crate::models::LeaderboardEntry;
use crate::services::error::ServiceResult;
use anyhow::Context;
use std::sync::Arc;

pub const DEFAULT_LEADERBOARD_SIZE: i64 = 10;
pub const MAX_LEADERBOARD_SIZE: i64 = 100;

pub struct ScoreService {
    score_repo: Arc<dyn ScoreRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl ScoreService {
    pub fn new(score_repo: Arc<dyn ScoreRepository>, user_repo: Arc<dyn UserRepository>) -> Self {
        Self {
            score_repo,
            user_repo,
        }
    }

    /// Recount and persist the user's score
    pub async fn recalculate(&self, user_id: i64) -> ServiceResult<i64> {
        let contributions = self
            .score_repo
            .contributions(user_id)
            .await
            .context("Failed to count contributions")?;
        let score = contributions.score();

        self.score_repo
            .store_score(user_id, score)
            .await
            .context("Failed to store score")?;

        tracing::debug!(user_id, score, "Contributor score recalculated");
        Ok(score)
    }

    /// Recalculate in the background. Never fails the caller.
    pub fn schedule(self: &Arc<Self>, user_id: i64) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = service.recalculate(user_id).await {
                tracing::warn!(user_id, "Score recalculation failed: {}", e);
            }
        });
    }

    /// Top users by score, `limit` clamped to 1..=100
    pub async fn leaderboard(&self, limit: Option<i64>) -> ServiceResult<Vec<LeaderboardEntry>> {
        let limit = limit
            .unwrap_or(DEFAULT_LEADERBOARD_SIZE)
            .clamp(1, MAX_LEADERBOARD_SIZE);

        let users = self
            .user_repo
            .leaderboard(limit)
            .await
            .context("Failed to load leaderboard")?;

        Ok(users
            .into_iter()
            .enumerate()
            .map(|(i, user)| LeaderboardEntry {
                rank: i as i64 + 1,
                user_id: user.id,
                username: user.username,
                display_name: user.display_name,
                avatar_url: user.avatar_url,
                contributor_score: user.contributor_score,
            })
            .collect())
    }
}
