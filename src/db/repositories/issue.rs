//! Issue repository

use crate::db::DbPool;
use crate::models::{Issue, IssueFilter, IssueStatus, ListParams, PagedResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

use super::tag::split_tag_names;

/// Column values for inserting or updating an issue
#[derive(Debug, Clone)]
pub struct IssueFields<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub code: Option<&'a str>,
    pub language: Option<&'a str>,
}

#[async_trait]
pub trait IssueRepository: Send + Sync {
    async fn create(&self, author_id: i64, fields: IssueFields<'_>) -> Result<Issue>;

    /// Get a non-deleted issue
    async fn get_by_id(&self, id: i64) -> Result<Option<Issue>>;

    async fn update(&self, id: i64, fields: IssueFields<'_>) -> Result<()>;

    async fn set_status(&self, id: i64, status: IssueStatus) -> Result<()>;

    async fn soft_delete(&self, id: i64) -> Result<()>;

    async fn list(&self, filter: &IssueFilter, params: &ListParams) -> Result<PagedResult<Issue>>;
}

pub struct SqlxIssueRepository {
    pool: DbPool,
}

impl SqlxIssueRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn IssueRepository> {
        Arc::new(Self::new(pool))
    }
}

const ISSUE_SELECT: &str = r#"
    SELECT i.id, i.author_id, u.username AS author_username, i.title, i.description, i.code,
           i.language, i.status, i.accepted_solution_id, i.likes_count, i.dislikes_count,
           i.solutions_count, i.is_deleted, i.created_at, i.updated_at,
           (SELECT GROUP_CONCAT(t.name, char(31))
              FROM content_tags ct JOIN tags t ON t.id = ct.tag_id
             WHERE ct.content_type = 'issue' AND ct.content_id = i.id) AS tag_names
    FROM issues i
    JOIN users u ON u.id = i.author_id
"#;

const ISSUE_FILTER: &str = r#"
    WHERE i.is_deleted = 0
      AND (? IS NULL OR i.status = ?)
      AND (? IS NULL OR i.author_id = ?)
      AND (? IS NULL OR EXISTS (
            SELECT 1 FROM content_tags ct JOIN tags t ON t.id = ct.tag_id
             WHERE ct.content_type = 'issue' AND ct.content_id = i.id AND t.name = ?))
"#;

#[async_trait]
impl IssueRepository for SqlxIssueRepository {
    async fn create(&self, author_id: i64, fields: IssueFields<'_>) -> Result<Issue> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO issues (author_id, title, description, code, language, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, 'open', ?, ?)",
        )
        .bind(author_id)
        .bind(fields.title)
        .bind(fields.description)
        .bind(fields.code)
        .bind(fields.language)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create issue")?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| anyhow::anyhow!("Issue vanished after insert"))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Issue>> {
        let sql = format!("{} WHERE i.id = ? AND i.is_deleted = 0", ISSUE_SELECT);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get issue by ID")?;

        row.as_ref().map(row_to_issue).transpose()
    }

    async fn update(&self, id: i64, fields: IssueFields<'_>) -> Result<()> {
        sqlx::query(
            "UPDATE issues SET title = ?, description = ?, code = ?, language = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(fields.title)
        .bind(fields.description)
        .bind(fields.code)
        .bind(fields.language)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to update issue")?;
        Ok(())
    }

    async fn set_status(&self, id: i64, status: IssueStatus) -> Result<()> {
        sqlx::query("UPDATE issues SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update issue status")?;
        Ok(())
    }

    async fn soft_delete(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE issues SET is_deleted = 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete issue")?;
        Ok(())
    }

    async fn list(&self, filter: &IssueFilter, params: &ListParams) -> Result<PagedResult<Issue>> {
        let status = filter.status.map(|s| s.to_string());
        let sql = format!(
            "{} {} ORDER BY i.created_at DESC, i.id DESC LIMIT ? OFFSET ?",
            ISSUE_SELECT, ISSUE_FILTER
        );
        let rows = sqlx::query(&sql)
            .bind(&status)
            .bind(&status)
            .bind(filter.author_id)
            .bind(filter.author_id)
            .bind(&filter.tag)
            .bind(&filter.tag)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list issues")?;

        let count_sql = format!("SELECT COUNT(*) AS count FROM issues i {}", ISSUE_FILTER);
        let total: i64 = sqlx::query(&count_sql)
            .bind(&status)
            .bind(&status)
            .bind(filter.author_id)
            .bind(filter.author_id)
            .bind(&filter.tag)
            .bind(&filter.tag)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count issues")?
            .try_get("count")?;

        let issues = rows.iter().map(row_to_issue).collect::<Result<Vec<_>>>()?;
        Ok(PagedResult::new(issues, total, params))
    }
}

fn row_to_issue(row: &sqlx::sqlite::SqliteRow) -> Result<Issue> {
    let status: String = row.try_get("status")?;
    let tag_names: Option<String> = row.try_get("tag_names")?;
    Ok(Issue {
        id: row.try_get("id")?,
        author_id: row.try_get("author_id")?,
        author_username: row.try_get("author_username")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        code: row.try_get("code")?,
        language: row.try_get("language")?,
        status: status.parse()?,
        accepted_solution_id: row.try_get("accepted_solution_id")?,
        likes_count: row.try_get("likes_count")?,
        dislikes_count: row.try_get("dislikes_count")?,
        solutions_count: row.try_get("solutions_count")?,
        tags: split_tag_names(tag_names),
        is_deleted: row.try_get("is_deleted")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
