//! Subscription (follow) repository

use crate::db::DbPool;
use crate::models::{ListParams, PagedResult, UserSummary};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Returns false if `follower_id` already follows `following_id`
    async fn follow(&self, follower_id: i64, following_id: i64) -> Result<bool>;

    /// Returns false if there was nothing to remove
    async fn unfollow(&self, follower_id: i64, following_id: i64) -> Result<bool>;

    async fn is_following(&self, follower_id: i64, following_id: i64) -> Result<bool>;

    /// Users following `user_id`, most recent first
    async fn followers(&self, user_id: i64, params: &ListParams)
        -> Result<PagedResult<UserSummary>>;

    /// Users `user_id` follows, most recent first
    async fn following(&self, user_id: i64, params: &ListParams)
        -> Result<PagedResult<UserSummary>>;

    /// `(followers, following)` counts, ignoring deleted users
    async fn counts(&self, user_id: i64) -> Result<(i64, i64)>;
}

pub struct SqlxSubscriptionRepository {
    pool: DbPool,
}

impl SqlxSubscriptionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn SubscriptionRepository> {
        Arc::new(Self::new(pool))
    }

    /// Page through one side of the relation. `key` is the column matched
    /// against `user_id`; `other` is the column holding the listed users.
    async fn list_side(
        &self,
        key: &str,
        other: &str,
        user_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<UserSummary>> {
        let sql = format!(
            r#"
            SELECT u.id, u.username, u.display_name, u.avatar_url
            FROM subscriptions s
            JOIN users u ON u.id = s.{other}
            WHERE s.{key} = ? AND u.is_deleted = 0
            ORDER BY s.created_at DESC, s.id DESC
            LIMIT ? OFFSET ?
            "#,
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list subscriptions")?;

        let count_sql = format!(
            "SELECT COUNT(*) AS count FROM subscriptions s JOIN users u ON u.id = s.{other} \
             WHERE s.{key} = ? AND u.is_deleted = 0",
        );
        let total: i64 = sqlx::query(&count_sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count subscriptions")?
            .try_get("count")?;

        let users = rows
            .iter()
            .map(|row| {
                Ok(UserSummary {
                    id: row.try_get("id")?,
                    username: row.try_get("username")?,
                    display_name: row.try_get("display_name")?,
                    avatar_url: row.try_get("avatar_url")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(PagedResult::new(users, total, params))
    }
}

#[async_trait]
impl SubscriptionRepository for SqlxSubscriptionRepository {
    async fn follow(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO subscriptions (follower_id, following_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(follower_id)
        .bind(following_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("Failed to follow user")?;
        Ok(result.rows_affected() == 1)
    }

    async fn unfollow(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE follower_id = ? AND following_id = ?")
            .bind(follower_id)
            .bind(following_id)
            .execute(&self.pool)
            .await
            .context("Failed to unfollow user")?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_following(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM subscriptions WHERE follower_id = ? AND following_id = ?")
            .bind(follower_id)
            .bind(following_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to check subscription")?;
        Ok(row.is_some())
    }

    async fn followers(
        &self,
        user_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<UserSummary>> {
        self.list_side("following_id", "follower_id", user_id, params).await
    }

    async fn following(
        &self,
        user_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<UserSummary>> {
        self.list_side("follower_id", "following_id", user_id, params).await
    }

    async fn counts(&self, user_id: i64) -> Result<(i64, i64)> {
        let row = sqlx::query(
            r#"
            SELECT
              (SELECT COUNT(*) FROM subscriptions s JOIN users u ON u.id = s.follower_id
                WHERE s.following_id = ? AND u.is_deleted = 0) AS followers,
              (SELECT COUNT(*) FROM subscriptions s JOIN users u ON u.id = s.following_id
                WHERE s.follower_id = ? AND u.is_deleted = 0) AS following
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count subscriptions")?;

        Ok((row.try_get("followers")?, row.try_get("following")?))
    }
}
