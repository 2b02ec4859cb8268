//! Suggested post repository
//!
//! Candidate selection runs in SQL; scoring and ranking happen in
//! `services::suggestion`.

use crate::db::{begin_write, DbPool};
use crate::models::{ListParams, PagedResult, SuggestedPost, SuggestionCandidate};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::sync::Arc;

/// Raw signals for one candidate post
#[derive(Debug, Clone)]
pub struct CandidateSignals {
    pub post_id: i64,
    pub created_at: DateTime<Utc>,
    pub followed_author: bool,
    pub shared_tags: i64,
}

/// How many of the user's own posts are used to collect tag names
const RECENT_OWN_POSTS: i64 = 20;

#[async_trait]
pub trait SuggestedPostRepository: Send + Sync {
    /// Posts by followed authors or sharing tag names with the user's recent
    /// posts. Excludes the user's own posts, posts they reacted to and
    /// suggestions they dismissed.
    async fn candidates(&self, user_id: i64) -> Result<Vec<CandidateSignals>>;

    /// Drop the user's non-dismissed suggestions and store `picks`
    async fn replace(&self, user_id: i64, picks: &[SuggestionCandidate]) -> Result<()>;

    /// Non-dismissed suggestions for live posts, best first
    async fn list(&self, user_id: i64, params: &ListParams) -> Result<PagedResult<SuggestedPost>>;

    /// Dismiss one of the user's suggestions. Returns false if not found.
    async fn dismiss(&self, user_id: i64, id: i64) -> Result<bool>;
}

pub struct SqlxSuggestedPostRepository {
    pool: DbPool,
}

impl SqlxSuggestedPostRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn SuggestedPostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SuggestedPostRepository for SqlxSuggestedPostRepository {
    async fn candidates(&self, user_id: i64) -> Result<Vec<CandidateSignals>> {
        let rows = sqlx::query(
            r#"
            WITH my_tags AS (
                SELECT DISTINCT t.name
                FROM tags t
                JOIN content_tags ct ON ct.tag_id = t.id AND ct.content_type = 'post'
                WHERE ct.content_id IN (
                    SELECT id FROM posts
                     WHERE author_id = ? AND is_deleted = 0
                     ORDER BY created_at DESC LIMIT ?)
            ),
            scored AS (
                SELECT p.id, p.created_at,
                       EXISTS (SELECT 1 FROM subscriptions s
                                WHERE s.follower_id = ? AND s.following_id = p.author_id) AS followed,
                       (SELECT COUNT(DISTINCT t.name)
                          FROM content_tags ct JOIN tags t ON t.id = ct.tag_id
                         WHERE ct.content_type = 'post' AND ct.content_id = p.id
                           AND t.name IN (SELECT name FROM my_tags)) AS shared_tags
                FROM posts p
                WHERE p.is_deleted = 0
                  AND p.author_id != ?
                  AND NOT EXISTS (SELECT 1 FROM interactions i
                                   WHERE i.user_id = ? AND i.target_type = 'post' AND i.target_id = p.id)
                  AND NOT EXISTS (SELECT 1 FROM suggested_posts sp
                                   WHERE sp.user_id = ? AND sp.post_id = p.id AND sp.is_dismissed = 1)
            )
            SELECT id, created_at, followed, shared_tags
            FROM scored
            WHERE followed = 1 OR shared_tags > 0
            "#,
        )
        .bind(user_id)
        .bind(RECENT_OWN_POSTS)
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to collect suggestion candidates")?;

        rows.iter()
            .map(|row| {
                Ok(CandidateSignals {
                    post_id: row.try_get("id")?,
                    created_at: row.try_get("created_at")?,
                    followed_author: row.try_get("followed")?,
                    shared_tags: row.try_get("shared_tags")?,
                })
            })
            .collect()
    }

    async fn replace(&self, user_id: i64, picks: &[SuggestionCandidate]) -> Result<()> {
        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        sqlx::query("DELETE FROM suggested_posts WHERE user_id = ? AND is_dismissed = 0")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear suggestions")?;

        for pick in picks {
            sqlx::query(
                "INSERT OR IGNORE INTO suggested_posts (user_id, post_id, reason, score, is_dismissed, created_at) \
                 VALUES (?, ?, ?, ?, 0, ?)",
            )
            .bind(user_id)
            .bind(pick.post_id)
            .bind(&pick.reason)
            .bind(pick.score)
            .bind(now)
            .execute(&mut *tx)
            .await
            .context("Failed to store suggestion")?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list(&self, user_id: i64, params: &ListParams) -> Result<PagedResult<SuggestedPost>> {
        let rows = sqlx::query(
            r#"
            SELECT sp.id, sp.user_id, sp.post_id, p.title AS post_title, p.author_id AS post_author_id,
                   sp.reason, sp.score, sp.is_dismissed, sp.created_at
            FROM suggested_posts sp
            JOIN posts p ON p.id = sp.post_id
            WHERE sp.user_id = ? AND sp.is_dismissed = 0 AND p.is_deleted = 0
            ORDER BY sp.score DESC, p.created_at DESC, sp.id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list suggestions")?;

        let total: i64 = sqlx::query(
            "SELECT COUNT(*) AS count FROM suggested_posts sp JOIN posts p ON p.id = sp.post_id \
             WHERE sp.user_id = ? AND sp.is_dismissed = 0 AND p.is_deleted = 0",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count suggestions")?
        .try_get("count")?;

        let items = rows
            .iter()
            .map(|row| {
                Ok(SuggestedPost {
                    id: row.try_get("id")?,
                    user_id: row.try_get("user_id")?,
                    post_id: row.try_get("post_id")?,
                    post_title: row.try_get("post_title")?,
                    post_author_id: row.try_get("post_author_id")?,
                    reason: row.try_get("reason")?,
                    score: row.try_get("score")?,
                    is_dismissed: row.try_get("is_dismissed")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(PagedResult::new(items, total, params))
    }

    async fn dismiss(&self, user_id: i64, id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE suggested_posts SET is_dismissed = 1 WHERE id = ? AND user_id = ? AND is_dismissed = 0",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .context("Failed to dismiss suggestion")?;
        Ok(result.rows_affected() == 1)
    }
}
