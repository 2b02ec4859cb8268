//! Comment repository
//!
//! Comments point at a post, snippet, issue or solution. Posts and snippets
//! keep a denormalized `comments_count` which is adjusted in the same
//! transaction as the comment row.

use crate::db::{begin_write, DbPool};
use crate::models::{Comment, CommentTarget, ReactionTally};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqliteConnection};
use std::sync::Arc;

use super::target::live_row_exists;

/// Result of trying to insert a comment
#[derive(Debug)]
pub enum CommentInsert {
    Created(Comment),
    TargetNotFound,
    ParentNotFound,
    /// The parent comment belongs to a different target
    ParentMismatch,
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(
        &self,
        author_id: i64,
        target: CommentTarget,
        target_id: i64,
        parent_id: Option<i64>,
        content: &str,
    ) -> Result<CommentInsert>;

    /// Get a non-deleted comment
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    async fn update(&self, id: i64, content: &str) -> Result<()>;

    /// Soft-delete and decrement the target's counter
    async fn soft_delete(&self, id: i64) -> Result<()>;

    /// Non-deleted comments on a target, oldest first
    async fn list_by_target(&self, target: CommentTarget, target_id: i64) -> Result<Vec<Comment>>;
}

pub struct SqlxCommentRepository {
    pool: DbPool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.author_id, u.username AS author_username, c.target_type, c.target_id,
           c.parent_id, c.content, c.reactions_count, c.reaction_counts, c.is_deleted,
           c.created_at, c.updated_at
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

async fn adjust_comment_counter(
    conn: &mut SqliteConnection,
    target: CommentTarget,
    target_id: i64,
    delta: i64,
) -> Result<()> {
    if !target.has_comment_counter() {
        return Ok(());
    }
    let sql = format!(
        "UPDATE {} SET comments_count = MAX(0, comments_count + ?) WHERE id = ?",
        target.table()
    );
    sqlx::query(&sql)
        .bind(delta)
        .bind(target_id)
        .execute(conn)
        .await
        .context("Failed to update comments count")?;
    Ok(())
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(
        &self,
        author_id: i64,
        target: CommentTarget,
        target_id: i64,
        parent_id: Option<i64>,
        content: &str,
    ) -> Result<CommentInsert> {
        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        if !live_row_exists(&mut tx, target.table(), target_id).await? {
            return Ok(CommentInsert::TargetNotFound);
        }

        if let Some(parent_id) = parent_id {
            let parent = sqlx::query(
                "SELECT target_type, target_id FROM comments WHERE id = ? AND is_deleted = 0",
            )
            .bind(parent_id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to load parent comment")?;

            let Some(parent) = parent else {
                return Ok(CommentInsert::ParentNotFound);
            };
            let parent_type: String = parent.try_get("target_type")?;
            let parent_target: i64 = parent.try_get("target_id")?;
            if parent_type != target.to_string() || parent_target != target_id {
                return Ok(CommentInsert::ParentMismatch);
            }
        }

        let id = sqlx::query(
            "INSERT INTO comments (author_id, target_type, target_id, parent_id, content, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(author_id)
        .bind(target.to_string())
        .bind(target_id)
        .bind(parent_id)
        .bind(content)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to create comment")?
        .last_insert_rowid();

        adjust_comment_counter(&mut tx, target, target_id, 1).await?;

        tx.commit().await?;

        let comment = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Comment vanished after insert"))?;
        Ok(CommentInsert::Created(comment))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let sql = format!("{} WHERE c.id = ? AND c.is_deleted = 0", COMMENT_SELECT);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get comment by ID")?;

        row.as_ref().map(row_to_comment).transpose()
    }

    async fn update(&self, id: i64, content: &str) -> Result<()> {
        sqlx::query("UPDATE comments SET content = ?, updated_at = ? WHERE id = ?")
            .bind(content)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update comment")?;
        Ok(())
    }

    async fn soft_delete(&self, id: i64) -> Result<()> {
        let mut tx = begin_write(&self.pool).await?;

        let row = sqlx::query(
            "SELECT target_type, target_id FROM comments WHERE id = ? AND is_deleted = 0",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to load comment")?;
        let Some(row) = row else {
            return Ok(());
        };
        let target: CommentTarget = row.try_get::<String, _>("target_type")?.parse()?;
        let target_id: i64 = row.try_get("target_id")?;

        sqlx::query("UPDATE comments SET is_deleted = 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete comment")?;

        adjust_comment_counter(&mut tx, target, target_id, -1).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_by_target(&self, target: CommentTarget, target_id: i64) -> Result<Vec<Comment>> {
        let sql = format!(
            "{} WHERE c.target_type = ? AND c.target_id = ? AND c.is_deleted = 0 \
             ORDER BY c.created_at ASC, c.id ASC",
            COMMENT_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(target.to_string())
            .bind(target_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list comments")?;

        rows.iter().map(row_to_comment).collect()
    }
}

fn row_to_comment(row: &sqlx::sqlite::SqliteRow) -> Result<Comment> {
    let target_type: String = row.try_get("target_type")?;
    let reaction_counts: String = row.try_get("reaction_counts")?;
    Ok(Comment {
        id: row.try_get("id")?,
        author_id: row.try_get("author_id")?,
        author_username: row.try_get("author_username")?,
        target_type: target_type.parse()?,
        target_id: row.try_get("target_id")?,
        parent_id: row.try_get("parent_id")?,
        content: row.try_get("content")?,
        reactions_count: row.try_get("reactions_count")?,
        reaction_counts: ReactionTally::from_json(&reaction_counts),
        is_deleted: row.try_get("is_deleted")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
