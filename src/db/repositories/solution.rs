//! Solution repository
//!
//! Creating, deleting and accepting solutions also touch the parent issue's
//! `solutions_count`, `status` and `accepted_solution_id`; those writes share
//! one transaction with the solution row.

use crate::db::{begin_write, DbPool};
use crate::models::{IssueStatus, Solution};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

/// Result of trying to add a solution to an issue
#[derive(Debug)]
pub enum SolutionInsert {
    Created(Solution),
    IssueNotFound,
    IssueClosed,
}

#[async_trait]
pub trait SolutionRepository: Send + Sync {
    /// Insert a solution and bump the issue's `solutions_count`
    async fn create(
        &self,
        issue_id: i64,
        author_id: i64,
        content: &str,
        code: Option<&str>,
    ) -> Result<SolutionInsert>;

    /// Get a non-deleted solution
    async fn get_by_id(&self, id: i64) -> Result<Option<Solution>>;

    async fn update(&self, id: i64, content: &str, code: Option<&str>) -> Result<()>;

    /// Soft-delete and decrement the issue counter. If this was the accepted
    /// solution the issue loses it, and a resolved issue goes back to open.
    async fn soft_delete(&self, id: i64) -> Result<()>;

    /// Accept a solution. Returns false if the issue already has one or is closed.
    async fn accept(&self, issue_id: i64, solution_id: i64) -> Result<bool>;

    /// Accepted first, then most liked, then oldest
    async fn list_by_issue(&self, issue_id: i64) -> Result<Vec<Solution>>;
}

pub struct SqlxSolutionRepository {
    pool: DbPool,
}

impl SqlxSolutionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn SolutionRepository> {
        Arc::new(Self::new(pool))
    }
}

const SOLUTION_SELECT: &str = r#"
    SELECT s.id, s.issue_id, s.author_id, u.username AS author_username, s.content, s.code,
           s.is_accepted, s.likes_count, s.dislikes_count, s.is_deleted, s.created_at, s.updated_at
    FROM solutions s
    JOIN users u ON u.id = s.author_id
"#;

#[async_trait]
impl SolutionRepository for SqlxSolutionRepository {
    async fn create(
        &self,
        issue_id: i64,
        author_id: i64,
        content: &str,
        code: Option<&str>,
    ) -> Result<SolutionInsert> {
        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let status = sqlx::query("SELECT status FROM issues WHERE id = ? AND is_deleted = 0")
            .bind(issue_id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to load issue")?;
        let status: IssueStatus = match status {
            Some(row) => row.try_get::<String, _>("status")?.parse()?,
            None => return Ok(SolutionInsert::IssueNotFound),
        };
        if status == IssueStatus::Closed {
            return Ok(SolutionInsert::IssueClosed);
        }

        let id = sqlx::query(
            "INSERT INTO solutions (issue_id, author_id, content, code, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(issue_id)
        .bind(author_id)
        .bind(content)
        .bind(code)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to create solution")?
        .last_insert_rowid();

        sqlx::query("UPDATE issues SET solutions_count = solutions_count + 1 WHERE id = ?")
            .bind(issue_id)
            .execute(&mut *tx)
            .await
            .context("Failed to increment solutions count")?;

        tx.commit().await?;

        let solution = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Solution vanished after insert"))?;
        Ok(SolutionInsert::Created(solution))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Solution>> {
        let sql = format!("{} WHERE s.id = ? AND s.is_deleted = 0", SOLUTION_SELECT);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get solution by ID")?;

        row.as_ref().map(row_to_solution).transpose()
    }

    async fn update(&self, id: i64, content: &str, code: Option<&str>) -> Result<()> {
        sqlx::query("UPDATE solutions SET content = ?, code = ?, updated_at = ? WHERE id = ?")
            .bind(content)
            .bind(code)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update solution")?;
        Ok(())
    }

    async fn soft_delete(&self, id: i64) -> Result<()> {
        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let row = sqlx::query("SELECT issue_id, is_accepted FROM solutions WHERE id = ? AND is_deleted = 0")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to load solution")?;
        let Some(row) = row else {
            return Ok(());
        };
        let issue_id: i64 = row.try_get("issue_id")?;
        let was_accepted: bool = row.try_get("is_accepted")?;

        sqlx::query("UPDATE solutions SET is_deleted = 1, is_accepted = 0, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete solution")?;

        sqlx::query(
            "UPDATE issues SET solutions_count = MAX(0, solutions_count - 1), updated_at = ? WHERE id = ?",
        )
        .bind(now)
        .bind(issue_id)
        .execute(&mut *tx)
        .await
        .context("Failed to decrement solutions count")?;

        if was_accepted {
            sqlx::query(
                "UPDATE issues SET accepted_solution_id = NULL, \
                 status = CASE WHEN status = 'resolved' THEN 'open' ELSE status END \
                 WHERE id = ? AND accepted_solution_id = ?",
            )
            .bind(issue_id)
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to reopen issue")?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn accept(&self, issue_id: i64, solution_id: i64) -> Result<bool> {
        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let claimed = sqlx::query(
            "UPDATE issues SET accepted_solution_id = ?, status = 'resolved', updated_at = ? \
             WHERE id = ? AND accepted_solution_id IS NULL AND status != 'closed' AND is_deleted = 0",
        )
        .bind(solution_id)
        .bind(now)
        .bind(issue_id)
        .execute(&mut *tx)
        .await
        .context("Failed to mark issue resolved")?;

        if claimed.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE solutions SET is_accepted = 1, updated_at = ? WHERE id = ? AND issue_id = ?")
            .bind(now)
            .bind(solution_id)
            .bind(issue_id)
            .execute(&mut *tx)
            .await
            .context("Failed to mark solution accepted")?;

        tx.commit().await?;
        Ok(true)
    }

    async fn list_by_issue(&self, issue_id: i64) -> Result<Vec<Solution>> {
        let sql = format!(
            "{} WHERE s.issue_id = ? AND s.is_deleted = 0 \
             ORDER BY s.is_accepted DESC, s.likes_count DESC, s.created_at ASC, s.id ASC",
            SOLUTION_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(issue_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list solutions")?;

        rows.iter().map(row_to_solution).collect()
    }
}

fn row_to_solution(row: &sqlx::sqlite::SqliteRow) -> Result<Solution> {
    Ok(Solution {
        id: row.try_get("id")?,
        issue_id: row.try_get("issue_id")?,
        author_id: row.try_get("author_id")?,
        author_username: row.try_get("author_username")?,
        content: row.try_get("content")?,
        code: row.try_get("code")?,
        is_accepted: row.try_get("is_accepted")?,
        likes_count: row.try_get("likes_count")?,
        dislikes_count: row.try_get("dislikes_count")?,
        is_deleted: row.try_get("is_deleted")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
