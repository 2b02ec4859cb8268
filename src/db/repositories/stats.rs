//! Platform-wide counts for the admin dashboard

use crate::db::DbPool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use sqlx::Row;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlatformStats {
    pub users: i64,
    pub deleted_users: i64,
    pub posts: i64,
    pub snippets: i64,
    pub private_snippets: i64,
    pub issues: i64,
    pub open_issues: i64,
    pub solutions: i64,
    pub comments: i64,
    pub collections: i64,
    pub tags: i64,
    pub votes: i64,
    pub interactions: i64,
}

#[async_trait]
pub trait StatsRepository: Send + Sync {
    async fn platform_stats(&self) -> Result<PlatformStats>;
}

pub struct SqlxStatsRepository {
    pool: DbPool,
}

impl SqlxStatsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn StatsRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl StatsRepository for SqlxStatsRepository {
    async fn platform_stats(&self) -> Result<PlatformStats> {
        let row = sqlx::query(
            r#"
            SELECT
              (SELECT COUNT(*) FROM users WHERE is_deleted = 0) AS users,
              (SELECT COUNT(*) FROM users WHERE is_deleted = 1) AS deleted_users,
              (SELECT COUNT(*) FROM posts WHERE is_deleted = 0) AS posts,
              (SELECT COUNT(*) FROM snippets WHERE is_deleted = 0) AS snippets,
              (SELECT COUNT(*) FROM private_snippets WHERE is_deleted = 0) AS private_snippets,
              (SELECT COUNT(*) FROM issues WHERE is_deleted = 0) AS issues,
              (SELECT COUNT(*) FROM issues WHERE is_deleted = 0 AND status = 'open') AS open_issues,
              (SELECT COUNT(*) FROM solutions WHERE is_deleted = 0) AS solutions,
              (SELECT COUNT(*) FROM comments WHERE is_deleted = 0) AS comments,
              (SELECT COUNT(*) FROM collections WHERE is_deleted = 0) AS collections,
              (SELECT COUNT(*) FROM tags) AS tags,
              (SELECT COUNT(*) FROM votes) AS votes,
              (SELECT COUNT(*) FROM interactions) AS interactions
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to load platform stats")?;

        Ok(PlatformStats {
            users: row.try_get("users")?,
            deleted_users: row.try_get("deleted_users")?,
            posts: row.try_get("posts")?,
            snippets: row.try_get("snippets")?,
            private_snippets: row.try_get("private_snippets")?,
            issues: row.try_get("issues")?,
            open_issues: row.try_get("open_issues")?,
            solutions: row.try_get("solutions")?,
            comments: row.try_get("comments")?,
            collections: row.try_get("collections")?,
            tags: row.try_get("tags")?,
            votes: row.try_get("votes")?,
            interactions: row.try_get("interactions")?,
        })
    }
}
