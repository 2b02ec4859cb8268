//! Vote service
//!
//! Likes and dislikes on issues and solutions. Voting the same way twice
//! removes the vote; voting the other way flips it.

use crate::db::repositories::VoteRepository;
use crate::models::{User, VoteResult, VoteTarget};
use crate::services::error::{ServiceError, ServiceResult};
use anyhow::Context;
use std::sync::Arc;

pub struct VoteService {
    repo: Arc<dyn VoteRepository>,
}

impl VoteService {
    pub fn new(repo: Arc<dyn VoteRepository>) -> Self {
        Self { repo }
    }

    pub async fn vote(
        &self,
        user: &User,
        target: VoteTarget,
        target_id: i64,
        is_dislike: bool,
    ) -> ServiceResult<VoteResult> {
        let result = self
            .repo
            .toggle(user.id, target, target_id, is_dislike)
            .await
            .context("Failed to apply vote")?
            .ok_or_else(|| ServiceError::not_found(label(target)))?;

        tracing::debug!(
            user_id = user.id,
            target = %target,
            target_id,
            outcome = ?result.outcome,
            "Vote applied"
        );
        Ok(result)
    }

    /// `Some(true)` when the user disliked the target
    pub async fn my_vote(
        &self,
        user: &User,
        target: VoteTarget,
        target_id: i64,
    ) -> ServiceResult<Option<bool>> {
        Ok(self
            .repo
            .get_user_vote(user.id, target, target_id)
            .await
            .context("Failed to load vote")?)
    }
}

fn label(target: VoteTarget) -> &'static str {
    match target {
        VoteTarget::Issue => "Issue",
        VoteTarget::Solution => "Solution",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        IssueFields, IssueRepository, SqlxIssueRepository, SqlxUserRepository, SqlxVoteRepository,
        UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{ToggleOutcome, UserRole};

    #[tokio::test]
    async fn test_vote_toggle_sequence() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let service = VoteService::new(SqlxVoteRepository::boxed(pool.clone()));

        let alice = SqlxUserRepository::new(pool.clone())
            .create(&User::new(
                "alice".to_string(),
                "alice@example.com".to_string(),
                None,
                UserRole::User,
            ))
            .await
            .unwrap();
        let issue = SqlxIssueRepository::new(pool.clone())
            .create(
                alice.id,
                IssueFields {
                    title: "Crash",
                    description: "It panics",
                    code: None,
                    language: None,
                },
            )
            .await
            .unwrap();

        let liked = service.vote(&alice, VoteTarget::Issue, issue.id, false).await.unwrap();
        assert_eq!(liked.outcome, ToggleOutcome::Created);
        assert_eq!((liked.likes_count, liked.dislikes_count), (1, 0));
        assert_eq!(
            service.my_vote(&alice, VoteTarget::Issue, issue.id).await.unwrap(),
            Some(false)
        );

        let flipped = service.vote(&alice, VoteTarget::Issue, issue.id, true).await.unwrap();
        assert_eq!(flipped.outcome, ToggleOutcome::Changed);
        assert_eq!((flipped.likes_count, flipped.dislikes_count), (0, 1));

        let removed = service.vote(&alice, VoteTarget::Issue, issue.id, true).await.unwrap();
        assert_eq!(removed.outcome, ToggleOutcome::Removed);
        assert_eq!((removed.likes_count, removed.dislikes_count), (0, 0));
        assert_eq!(service.my_vote(&alice, VoteTarget::Issue, issue.id).await.unwrap(), None);

        assert!(matches!(
            service.vote(&alice, VoteTarget::Solution, 404, false).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
