//! Suggested posts
//!
//! Candidates come from the repository with raw signals; ranking is a pure
//! function so it can be tested without a database.

use crate::db::repositories::{CandidateSignals, SuggestedPostRepository};
use crate::models::{ListParams, PagedResult, SuggestedPost, SuggestionCandidate, User};
use crate::services::error::{ServiceError, ServiceResult};
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub const FOLLOWED_AUTHOR_POINTS: i64 = 10;
pub const SHARED_TAG_POINTS: i64 = 3;
/// Posts younger than this many days get one bonus point per remaining day
pub const RECENCY_WINDOW_DAYS: i64 = 7;
pub const MAX_SUGGESTIONS: usize = 20;

pub const REASON_FOLLOWED_AUTHOR: &str = "followed_author";
pub const REASON_SHARED_TAGS: &str = "shared_tags";

/// Score one candidate. Candidates with neither signal score `None`.
pub fn score_candidate(signals: &CandidateSignals, now: DateTime<Utc>) -> Option<SuggestionCandidate> {
    let shared_tags = signals.shared_tags.max(0);
    if !signals.followed_author && shared_tags == 0 {
        return None;
    }

    let age_days = (now - signals.created_at).num_days().max(0);
    let recency = (RECENCY_WINDOW_DAYS - age_days).max(0);
    let mut score = shared_tags * SHARED_TAG_POINTS + recency;
    if signals.followed_author {
        score += FOLLOWED_AUTHOR_POINTS;
    }

    let reason = if signals.followed_author {
        REASON_FOLLOWED_AUTHOR
    } else {
        REASON_SHARED_TAGS
    };

    Some(SuggestionCandidate {
        post_id: signals.post_id,
        reason: reason.to_string(),
        score,
    })
}

/// Score, sort (best first, newer post id breaks ties) and keep the top picks
pub fn rank_candidates(candidates: &[CandidateSignals], now: DateTime<Utc>) -> Vec<SuggestionCandidate> {
    let mut scored: Vec<SuggestionCandidate> = candidates
        .iter()
        .filter_map(|c| score_candidate(c, now))
        .collect();
    scored.sort_by(|a, b| b.score.cmp(&a.score).then(b.post_id.cmp(&a.post_id)));
    scored.truncate(MAX_SUGGESTIONS);
    scored
}

pub struct SuggestionService {
    repo: Arc<dyn SuggestedPostRepository>,
}

impl SuggestionService {
    pub fn new(repo: Arc<dyn SuggestedPostRepository>) -> Self {
        Self { repo }
    }

    /// Rebuild the user's suggestions. Dismissed ones stay dismissed.
    pub async fn refresh(&self, user: &User) -> ServiceResult<usize> {
        let candidates = self
            .repo
            .candidates(user.id)
            .await
            .context("Failed to collect suggestion candidates")?;
        let picks = rank_candidates(&candidates, Utc::now());

        self.repo
            .replace(user.id, &picks)
            .await
            .context("Failed to store suggestions")?;
        tracing::debug!(user_id = user.id, count = picks.len(), "Suggestions refreshed");
        Ok(picks.len())
    }

    pub async fn list(
        &self,
        user: &User,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<SuggestedPost>> {
        Ok(self
            .repo
            .list(user.id, params)
            .await
            .context("Failed to list suggestions")?)
    }

    pub async fn dismiss(&self, user: &User, id: i64) -> ServiceResult<()> {
        let dismissed = self
            .repo
            .dismiss(user.id, id)
            .await
            .context("Failed to dismiss suggestion")?;
        if !dismissed {
            return Err(ServiceError::not_found("Suggestion"));
        }
        Ok(())
    }
}
