//! Reaction service

use crate::db::repositories::InteractionRepository;
use crate::models::{ReactionResult, ReactionSummary, ReactionTarget, ReactionType, User};
use crate::services::error::{ServiceError, ServiceResult};
use anyhow::Context;
use std::sync::Arc;

pub struct InteractionService {
    repo: Arc<dyn InteractionRepository>,
}

impl InteractionService {
    pub fn new(repo: Arc<dyn InteractionRepository>) -> Self {
        Self { repo }
    }

    /// Add, switch or remove the user's reaction on a target
    pub async fn react(
        &self,
        user: &User,
        target: ReactionTarget,
        target_id: i64,
        reaction: ReactionType,
    ) -> ServiceResult<ReactionResult> {
        let result = self
            .repo
            .toggle(user.id, target, target_id, reaction)
            .await
            .context("Failed to apply reaction")?
            .ok_or_else(|| ServiceError::not_found(label(target)))?;

        tracing::debug!(
            user_id = user.id,
            target = %target,
            target_id,
            reaction = %reaction,
            outcome = ?result.outcome,
            "Reaction applied"
        );
        Ok(result)
    }

    pub async fn summary(
        &self,
        viewer: Option<&User>,
        target: ReactionTarget,
        target_id: i64,
    ) -> ServiceResult<ReactionSummary> {
        self.repo
            .summary(viewer.map(|u| u.id), target, target_id)
            .await
            .context("Failed to load reactions")?
            .ok_or_else(|| ServiceError::not_found(label(target)))
    }

    pub async fn my_reaction(
        &self,
        user: &User,
        target: ReactionTarget,
        target_id: i64,
    ) -> ServiceResult<Option<ReactionType>> {
        Ok(self
            .repo
            .get_user_reaction(user.id, target, target_id)
            .await
            .context("Failed to load reaction")?)
    }
}

fn label(target: ReactionTarget) -> &'static str {
    match target {
        ReactionTarget::Post => "Post",
        ReactionTarget::Snippet => "Snippet",
        ReactionTarget::Comment => "Comment",
    }
}
