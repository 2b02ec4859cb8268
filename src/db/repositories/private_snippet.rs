//! Private snippet repository
//!
//! Each code change is stored as a new row in `private_snippet_versions`.
//! Version rows are never updated or deleted.

use crate::db::{begin_write, DbPool};
use crate::models::{ListParams, PagedResult, PrivateSnippet, PrivateSnippetVersion};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait PrivateSnippetRepository: Send + Sync {
    /// Create the snippet together with version 1
    async fn create(
        &self,
        owner_id: i64,
        title: &str,
        language: &str,
        code: &str,
    ) -> Result<PrivateSnippet>;

    /// Get a non-deleted snippet with the code of its current version
    async fn get_by_id(&self, id: i64) -> Result<Option<PrivateSnippet>>;

    async fn update_meta(&self, id: i64, title: &str, language: &str) -> Result<()>;

    /// Append a new version and make it current. Returns the new version number.
    async fn add_version(&self, id: i64, code: &str, change_note: Option<&str>) -> Result<i64>;

    /// Versions, newest first
    async fn list_versions(&self, id: i64) -> Result<Vec<PrivateSnippetVersion>>;

    async fn get_version(&self, id: i64, version: i64) -> Result<Option<PrivateSnippetVersion>>;

    async fn list_by_owner(
        &self,
        owner_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<PrivateSnippet>>;

    async fn soft_delete(&self, id: i64) -> Result<()>;
}

pub struct SqlxPrivateSnippetRepository {
    pool: DbPool,
}

impl SqlxPrivateSnippetRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn PrivateSnippetRepository> {
        Arc::new(Self::new(pool))
    }
}

const PRIVATE_SNIPPET_SELECT: &str = r#"
    SELECT ps.id, ps.owner_id, ps.title, ps.language, ps.current_version, v.code,
           ps.is_deleted, ps.created_at, ps.updated_at
    FROM private_snippets ps
    JOIN private_snippet_versions v
      ON v.snippet_id = ps.id AND v.version = ps.current_version
"#;

#[async_trait]
impl PrivateSnippetRepository for SqlxPrivateSnippetRepository {
    async fn create(
        &self,
        owner_id: i64,
        title: &str,
        language: &str,
        code: &str,
    ) -> Result<PrivateSnippet> {
        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let id = sqlx::query(
            "INSERT INTO private_snippets (owner_id, title, language, current_version, created_at, updated_at) \
             VALUES (?, ?, ?, 1, ?, ?)",
        )
        .bind(owner_id)
        .bind(title)
        .bind(language)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to create private snippet")?
        .last_insert_rowid();

        sqlx::query(
            "INSERT INTO private_snippet_versions (snippet_id, version, code, change_note, created_at) \
             VALUES (?, 1, ?, NULL, ?)",
        )
        .bind(id)
        .bind(code)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to store initial version")?;

        tx.commit().await?;

        Ok(PrivateSnippet {
            id,
            owner_id,
            title: title.to_string(),
            language: language.to_string(),
            current_version: 1,
            code: code.to_string(),
            is_deleted: false,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<PrivateSnippet>> {
        let sql = format!(
            "{} WHERE ps.id = ? AND ps.is_deleted = 0",
            PRIVATE_SNIPPET_SELECT
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get private snippet")?;

        row.as_ref().map(row_to_private_snippet).transpose()
    }

    async fn update_meta(&self, id: i64, title: &str, language: &str) -> Result<()> {
        sqlx::query("UPDATE private_snippets SET title = ?, language = ?, updated_at = ? WHERE id = ?")
            .bind(title)
            .bind(language)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update private snippet")?;
        Ok(())
    }

    async fn add_version(&self, id: i64, code: &str, change_note: Option<&str>) -> Result<i64> {
        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let current: i64 = sqlx::query("SELECT current_version FROM private_snippets WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to read current version")?
            .ok_or_else(|| anyhow::anyhow!("Private snippet {} not found", id))?
            .try_get("current_version")?;
        let next = current + 1;

        sqlx::query(
            "INSERT INTO private_snippet_versions (snippet_id, version, code, change_note, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(next)
        .bind(code)
        .bind(change_note)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to store snippet version")?;

        sqlx::query("UPDATE private_snippets SET current_version = ?, updated_at = ? WHERE id = ?")
            .bind(next)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to bump current version")?;

        tx.commit().await?;
        Ok(next)
    }

    async fn list_versions(&self, id: i64) -> Result<Vec<PrivateSnippetVersion>> {
        let rows = sqlx::query(
            "SELECT id, snippet_id, version, code, change_note, created_at \
             FROM private_snippet_versions WHERE snippet_id = ? ORDER BY version DESC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list snippet versions")?;

        rows.iter().map(row_to_version).collect()
    }

    async fn get_version(&self, id: i64, version: i64) -> Result<Option<PrivateSnippetVersion>> {
        let row = sqlx::query(
            "SELECT id, snippet_id, version, code, change_note, created_at \
             FROM private_snippet_versions WHERE snippet_id = ? AND version = ?",
        )
        .bind(id)
        .bind(version)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get snippet version")?;

        row.as_ref().map(row_to_version).transpose()
    }

    async fn list_by_owner(
        &self,
        owner_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<PrivateSnippet>> {
        let sql = format!(
            "{} WHERE ps.owner_id = ? AND ps.is_deleted = 0 \
             ORDER BY ps.updated_at DESC, ps.id DESC LIMIT ? OFFSET ?",
            PRIVATE_SNIPPET_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(owner_id)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list private snippets")?;

        let total: i64 = sqlx::query(
            "SELECT COUNT(*) AS count FROM private_snippets WHERE owner_id = ? AND is_deleted = 0",
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count private snippets")?
        .try_get("count")?;

        let items = rows
            .iter()
            .map(row_to_private_snippet)
            .collect::<Result<Vec<_>>>()?;
        Ok(PagedResult::new(items, total, params))
    }

    async fn soft_delete(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE private_snippets SET is_deleted = 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete private snippet")?;
        Ok(())
    }
}

fn row_to_private_snippet(row: &sqlx::sqlite::SqliteRow) -> Result<PrivateSnippet> {
    Ok(PrivateSnippet {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        title: row.try_get("title")?,
        language: row.try_get("language")?,
        current_version: row.try_get("current_version")?,
        code: row.try_get("code")?,
        is_deleted: row.try_get("is_deleted")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_version(row: &sqlx::sqlite::SqliteRow) -> Result<PrivateSnippetVersion> {
    Ok(PrivateSnippetVersion {
        id: row.try_get("id")?,
        snippet_id: row.try_get("snippet_id")?,
        version: row.try_get("version")?,
        code: row.try_get("code")?,
        change_note: row.try_get("change_note")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (SqlxPrivateSnippetRepository, i64) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let owner = sqlx::query("INSERT INTO users (username, email) VALUES ('owner', 'o@example.com')")
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();
        (SqlxPrivateSnippetRepository::new(pool), owner)
    }

    #[tokio::test]
    async fn test_create_stores_version_one() {
        let (repo, owner) = setup().await;
        let snippet = repo.create(owner, "notes", "rust", "v1").await.unwrap();

        let versions = repo.list_versions(snippet.id).await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].version, 1);
        assert_eq!(versions[0].code, "v1");
    }

    #[tokio::test]
    async fn test_add_version_bumps_current() {
        let (repo, owner) = setup().await;
        let snippet = repo.create(owner, "notes", "rust", "v1").await.unwrap();

        assert_eq!(repo.add_version(snippet.id, "v2", Some("fix")).await.unwrap(), 2);
        assert_eq!(repo.add_version(snippet.id, "v3", None).await.unwrap(), 3);

        let current = repo.get_by_id(snippet.id).await.unwrap().unwrap();
        assert_eq!(current.current_version, 3);
        assert_eq!(current.code, "v3");

        let versions: Vec<i64> = repo
            .list_versions(snippet.id)
            .await
            .unwrap()
            .iter()
            .map(|v| v.version)
            .collect();
        assert_eq!(versions, vec![3, 2, 1]);

        let second = repo.get_version(snippet.id, 2).await.unwrap().unwrap();
        assert_eq!(second.change_note.as_deref(), Some("fix"));
    }

    #[tokio::test]
    async fn test_meta_update_keeps_version() {
        let (repo, owner) = setup().await;
        let snippet = repo.create(owner, "old", "rust", "code").await.unwrap();
        repo.update_meta(snippet.id, "new", "go").await.unwrap();

        let updated = repo.get_by_id(snippet.id).await.unwrap().unwrap();
        assert_eq!(updated.title, "new");
        assert_eq!(updated.current_version, 1);
    }
}
