//! Helpers shared by repositories that reference content polymorphically
//!
//! Table names passed here always come from the target enums in
//! `crate::models`, never from user input.

use crate::db::DbPool;
use crate::models::ContentType;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqliteConnection};
use std::sync::Arc;

/// Whether a non-deleted row with `id` exists in `table`
pub async fn live_row_exists(conn: &mut SqliteConnection, table: &str, id: i64) -> Result<bool> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ? AND is_deleted = 0", table);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await
        .with_context(|| format!("Failed to check {} existence", table))?;
    Ok(row.is_some())
}

/// Author of a non-deleted row, if it exists
pub async fn live_row_author(
    conn: &mut SqliteConnection,
    table: &str,
    id: i64,
) -> Result<Option<i64>> {
    let sql = format!(
        "SELECT author_id FROM {} WHERE id = ? AND is_deleted = 0",
        table
    );
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await
        .with_context(|| format!("Failed to load {} author", table))?;

    match row {
        Some(row) => Ok(Some(row.try_get("author_id")?)),
        None => Ok(None),
    }
}

/// Whether an error is a SQLite uniqueness violation
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .map(|db| db.is_unique_violation())
            .unwrap_or(false)
    })
}

/// Read-only lookups on taggable/collectable content
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Author of a non-deleted post, snippet or issue
    async fn author_of(&self, content_type: ContentType, id: i64) -> Result<Option<i64>>;
}

pub struct SqlxContentRepository {
    pool: DbPool,
}

impl SqlxContentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn ContentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ContentRepository for SqlxContentRepository {
    async fn author_of(&self, content_type: ContentType, id: i64) -> Result<Option<i64>> {
        let mut conn = self.pool.acquire().await?;
        live_row_author(&mut conn, content_type.table(), id).await
    }
}
