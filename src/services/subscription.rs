//! Follow relationships between users

use crate::db::repositories::{SubscriptionRepository, UserRepository};
use crate::models::{ListParams, PagedResult, User, UserSummary};
use crate::services::error::{ServiceError, ServiceResult};
use anyhow::Context;
use std::sync::Arc;

pub struct SubscriptionService {
    subscription_repo: Arc<dyn SubscriptionRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl SubscriptionService {
    pub fn new(
        subscription_repo: Arc<dyn SubscriptionRepository>,
        user_repo: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            subscription_repo,
            user_repo,
        }
    }

    pub async fn follow(&self, follower: &User, username: &str) -> ServiceResult<()> {
        let target = self.live_user(username).await?;
        if target.id == follower.id {
            return Err(ServiceError::validation("You cannot follow yourself"));
        }

        let created = self
            .subscription_repo
            .follow(follower.id, target.id)
            .await
            .context("Failed to follow user")?;
        if !created {
            return Err(ServiceError::conflict(format!(
                "Already following '{}'",
                target.username
            )));
        }
        tracing::debug!(follower = follower.id, following = target.id, "Followed");
        Ok(())
    }

    pub async fn unfollow(&self, follower: &User, username: &str) -> ServiceResult<()> {
        let target = self.live_user(username).await?;
        let removed = self
            .subscription_repo
            .unfollow(follower.id, target.id)
            .await
            .context("Failed to unfollow user")?;
        if !removed {
            return Err(ServiceError::NotFound(format!(
                "You are not following '{}'",
                target.username
            )));
        }
        Ok(())
    }

    pub async fn is_following(&self, follower: &User, username: &str) -> ServiceResult<bool> {
        let target = self.live_user(username).await?;
        Ok(self
            .subscription_repo
            .is_following(follower.id, target.id)
            .await
            .context("Failed to check subscription")?)
    }

    pub async fn followers(
        &self,
        username: &str,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<UserSummary>> {
        let user = self.live_user(username).await?;
        Ok(self
            .subscription_repo
            .followers(user.id, params)
            .await
            .context("Failed to list followers")?)
    }

    pub async fn following(
        &self,
        username: &str,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<UserSummary>> {
        let user = self.live_user(username).await?;
        Ok(self
            .subscription_repo
            .following(user.id, params)
            .await
            .context("Failed to list following")?)
    }

    async fn live_user(&self, username: &str) -> ServiceResult<User> {
        self.user_repo
            .get_by_username(username)
            .await
            .context("Failed to look up user")?
            .filter(|u| !u.is_deleted)
            .ok_or_else(|| ServiceError::not_found("User"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSubscriptionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations, DbPool};
    use crate::models::UserRole;

    async fn setup_test_service() -> (DbPool, SubscriptionService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let service = SubscriptionService::new(
            SqlxSubscriptionRepository::boxed(pool.clone()),
            SqlxUserRepository::boxed(pool.clone()),
        );
        (pool, service)
    }

    async fn create_user(pool: &DbPool, name: &str) -> User {
        SqlxUserRepository::new(pool.clone())
            .create(&User::new(
                name.to_string(),
                format!("{}@example.com", name),
                None,
                UserRole::User,
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_follow_lifecycle() {
        let (pool, service) = setup_test_service().await;
        let alice = create_user(&pool, "alice").await;
        let bob = create_user(&pool, "bob").await;

        service.follow(&alice, "bob").await.unwrap();
        assert!(service.is_following(&alice, "bob").await.unwrap());
        assert!(matches!(
            service.follow(&alice, "bob").await,
            Err(ServiceError::Conflict(_))
        ));

        let followers = service.followers("bob", &ListParams::default()).await.unwrap();
        assert_eq!(followers.total, 1);
        assert_eq!(followers.items[0].id, alice.id);
        let following = service.following("alice", &ListParams::default()).await.unwrap();
        assert_eq!(following.items[0].id, bob.id);

        service.unfollow(&alice, "bob").await.unwrap();
        assert!(matches!(
            service.unfollow(&alice, "bob").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_follow_rules() {
        let (pool, service) = setup_test_service().await;
        let alice = create_user(&pool, "alice").await;

        assert!(matches!(
            service.follow(&alice, "alice").await,
            Err(ServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.follow(&alice, "ghost").await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
