//! Snippet repository
//!
//! Public code snippets. Same shape as posts, plus a language filter.

use crate::db::DbPool;
use crate::models::{ListParams, PagedResult, ReactionTally, Snippet, SnippetFilter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

use super::tag::split_tag_names;

/// Column values for inserting or updating a snippet
#[derive(Debug, Clone)]
pub struct SnippetFields<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub code: &'a str,
    pub language: &'a str,
}

#[async_trait]
pub trait SnippetRepository: Send + Sync {
    async fn create(&self, author_id: i64, fields: SnippetFields<'_>) -> Result<Snippet>;

    /// Get a non-deleted snippet
    async fn get_by_id(&self, id: i64) -> Result<Option<Snippet>>;

    async fn update(&self, id: i64, fields: SnippetFields<'_>) -> Result<()>;

    async fn soft_delete(&self, id: i64) -> Result<()>;

    async fn list(&self, filter: &SnippetFilter, params: &ListParams)
        -> Result<PagedResult<Snippet>>;
}

pub struct SqlxSnippetRepository {
    pool: DbPool,
}

impl SqlxSnippetRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn SnippetRepository> {
        Arc::new(Self::new(pool))
    }
}

const SNIPPET_SELECT: &str = r#"
    SELECT s.id, s.author_id, u.username AS author_username, s.title, s.description, s.code,
           s.language, s.comments_count, s.reactions_count, s.reaction_counts, s.is_deleted,
           s.created_at, s.updated_at,
           (SELECT GROUP_CONCAT(t.name, char(31))
              FROM content_tags ct JOIN tags t ON t.id = ct.tag_id
             WHERE ct.content_type = 'snippet' AND ct.content_id = s.id) AS tag_names
    FROM snippets s
    JOIN users u ON u.id = s.author_id
"#;

const SNIPPET_FILTER: &str = r#"
    WHERE s.is_deleted = 0
      AND (? IS NULL OR s.author_id = ?)
      AND (? IS NULL OR LOWER(s.language) = LOWER(?))
      AND (? IS NULL OR EXISTS (
            SELECT 1 FROM content_tags ct JOIN tags t ON t.id = ct.tag_id
             WHERE ct.content_type = 'snippet' AND ct.content_id = s.id AND t.name = ?))
"#;

#[async_trait]
impl SnippetRepository for SqlxSnippetRepository {
    async fn create(&self, author_id: i64, fields: SnippetFields<'_>) -> Result<Snippet> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO snippets (author_id, title, description, code, language, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
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
        .context("Failed to create snippet")?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| anyhow::anyhow!("Snippet vanished after insert"))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Snippet>> {
        let sql = format!("{} WHERE s.id = ? AND s.is_deleted = 0", SNIPPET_SELECT);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get snippet by ID")?;

        row.as_ref().map(row_to_snippet).transpose()
    }

    async fn update(&self, id: i64, fields: SnippetFields<'_>) -> Result<()> {
        sqlx::query(
            "UPDATE snippets SET title = ?, description = ?, code = ?, language = ?, updated_at = ? \
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
        .context("Failed to update snippet")?;
        Ok(())
    }

    async fn soft_delete(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE snippets SET is_deleted = 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete snippet")?;
        Ok(())
    }

    async fn list(
        &self,
        filter: &SnippetFilter,
        params: &ListParams,
    ) -> Result<PagedResult<Snippet>> {
        let sql = format!(
            "{} {} ORDER BY s.created_at DESC, s.id DESC LIMIT ? OFFSET ?",
            SNIPPET_SELECT, SNIPPET_FILTER
        );
        let rows = sqlx::query(&sql)
            .bind(filter.author_id)
            .bind(filter.author_id)
            .bind(&filter.language)
            .bind(&filter.language)
            .bind(&filter.tag)
            .bind(&filter.tag)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list snippets")?;

        let count_sql = format!("SELECT COUNT(*) AS count FROM snippets s {}", SNIPPET_FILTER);
        let total: i64 = sqlx::query(&count_sql)
            .bind(filter.author_id)
            .bind(filter.author_id)
            .bind(&filter.language)
            .bind(&filter.language)
            .bind(&filter.tag)
            .bind(&filter.tag)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count snippets")?
            .try_get("count")?;

        let snippets = rows.iter().map(row_to_snippet).collect::<Result<Vec<_>>>()?;
        Ok(PagedResult::new(snippets, total, params))
    }
}

fn row_to_snippet(row: &sqlx::sqlite::SqliteRow) -> Result<Snippet> {
    let reaction_counts: String = row.try_get("reaction_counts")?;
    let tag_names: Option<String> = row.try_get("tag_names")?;
    Ok(Snippet {
        id: row.try_get("id")?,
        author_id: row.try_get("author_id")?,
        author_username: row.try_get("author_username")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        code: row.try_get("code")?,
        language: row.try_get("language")?,
        comments_count: row.try_get("comments_count")?,
        reactions_count: row.try_get("reactions_count")?,
        reaction_counts: ReactionTally::from_json(&reaction_counts),
        tags: split_tag_names(tag_names),
        is_deleted: row.try_get("is_deleted")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
