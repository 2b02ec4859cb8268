//! Tag repository
//!
//! Database operations for per-user tags and their links to content.
//!
//! This module provides:
//! - `TagRepository` trait defining the interface for tag data access
//! - `SqlxTagRepository` implementing the trait for SQLite
//! - `split_tag_names` for decoding the `GROUP_CONCAT` tag column used by
//!   the content repositories

use crate::db::{begin_write, DbPool};
use crate::models::{ContentType, Tag, TagWithCount, TaggedContent};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

/// Separator used with `GROUP_CONCAT(name, char(31))`
const TAG_SEPARATOR: char = '\u{1f}';

/// Decode a concatenated tag-name column into a sorted list
pub fn split_tag_names(raw: Option<String>) -> Vec<String> {
    let mut names: Vec<String> = raw
        .map(|s| {
            s.split(TAG_SEPARATOR)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names.dedup();
    names
}

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a new tag
    async fn create(&self, tag: &Tag) -> Result<Tag>;

    /// Get tag by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    /// Get one of an owner's tags by normalized name
    async fn get_by_owner_and_name(&self, owner_id: i64, name: &str) -> Result<Option<Tag>>;

    /// All tags of an owner with the number of items each is attached to
    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<TagWithCount>>;

    async fn update(&self, id: i64, name: &str, color: Option<&str>) -> Result<()>;

    /// Delete a tag and its content links
    async fn delete(&self, id: i64) -> Result<()>;

    /// Link a tag to content. Linking twice is a no-op.
    async fn attach(&self, tag_id: i64, content: TaggedContent) -> Result<()>;

    /// Unlink a tag. Returns false if it was not linked.
    async fn detach(&self, tag_id: i64, content: TaggedContent) -> Result<bool>;

    /// Non-deleted content the tag is attached to
    async fn list_content(&self, tag_id: i64) -> Result<Vec<TaggedContent>>;

    /// Replace the owner's tags on a piece of content with `names`, creating
    /// missing tags. Names must already be normalized.
    async fn set_content_tags(
        &self,
        owner_id: i64,
        content: TaggedContent,
        names: &[String],
    ) -> Result<()>;
}

/// SQLx-based tag repository implementation
pub struct SqlxTagRepository {
    pool: DbPool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DbPool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, tag: &Tag) -> Result<Tag> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO tags (owner_id, name, color, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(tag.owner_id)
        .bind(&tag.name)
        .bind(&tag.color)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create tag")?;

        Ok(Tag {
            id: result.last_insert_rowid(),
            created_at: now,
            ..tag.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        let row = sqlx::query("SELECT id, owner_id, name, color, created_at FROM tags WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get tag by ID")?;

        row.as_ref().map(row_to_tag).transpose()
    }

    async fn get_by_owner_and_name(&self, owner_id: i64, name: &str) -> Result<Option<Tag>> {
        let row = sqlx::query(
            "SELECT id, owner_id, name, color, created_at FROM tags WHERE owner_id = ? AND name = ?",
        )
        .bind(owner_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get tag by name")?;

        row.as_ref().map(row_to_tag).transpose()
    }

    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<TagWithCount>> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.owner_id, t.name, t.color, t.created_at,
                   COUNT(ct.tag_id) AS usage_count
            FROM tags t
            LEFT JOIN content_tags ct ON ct.tag_id = t.id
            WHERE t.owner_id = ?
            GROUP BY t.id, t.owner_id, t.name, t.color, t.created_at
            ORDER BY usage_count DESC, t.name ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list tags")?;

        rows.iter()
            .map(|row| {
                Ok(TagWithCount {
                    tag: row_to_tag(row)?,
                    usage_count: row.try_get("usage_count")?,
                })
            })
            .collect()
    }

    async fn update(&self, id: i64, name: &str, color: Option<&str>) -> Result<()> {
        sqlx::query("UPDATE tags SET name = ?, color = ? WHERE id = ?")
            .bind(name)
            .bind(color)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update tag")?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = begin_write(&self.pool).await?;
        sqlx::query("DELETE FROM content_tags WHERE tag_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to unlink tag")?;
        sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete tag")?;
        tx.commit().await?;
        Ok(())
    }

    async fn attach(&self, tag_id: i64, content: TaggedContent) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO content_tags (tag_id, content_type, content_id) VALUES (?, ?, ?)",
        )
        .bind(tag_id)
        .bind(content.content_type.to_string())
        .bind(content.content_id)
        .execute(&self.pool)
        .await
        .context("Failed to attach tag")?;
        Ok(())
    }

    async fn detach(&self, tag_id: i64, content: TaggedContent) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM content_tags WHERE tag_id = ? AND content_type = ? AND content_id = ?",
        )
        .bind(tag_id)
        .bind(content.content_type.to_string())
        .bind(content.content_id)
        .execute(&self.pool)
        .await
        .context("Failed to detach tag")?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_content(&self, tag_id: i64) -> Result<Vec<TaggedContent>> {
        let rows = sqlx::query(
            r#"
            SELECT ct.content_type, ct.content_id
            FROM content_tags ct
            WHERE ct.tag_id = ?
              AND ((ct.content_type = 'post'
                    AND EXISTS (SELECT 1 FROM posts p WHERE p.id = ct.content_id AND p.is_deleted = 0))
                OR (ct.content_type = 'snippet'
                    AND EXISTS (SELECT 1 FROM snippets s WHERE s.id = ct.content_id AND s.is_deleted = 0))
                OR (ct.content_type = 'issue'
                    AND EXISTS (SELECT 1 FROM issues i WHERE i.id = ct.content_id AND i.is_deleted = 0)))
            ORDER BY ct.content_type, ct.content_id DESC
            "#,
        )
        .bind(tag_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list tagged content")?;

        rows.iter()
            .map(|row| {
                Ok(TaggedContent {
                    content_type: row.try_get::<String, _>("content_type")?.parse::<ContentType>()?,
                    content_id: row.try_get("content_id")?,
                })
            })
            .collect()
    }

    async fn set_content_tags(
        &self,
        owner_id: i64,
        content: TaggedContent,
        names: &[String],
    ) -> Result<()> {
        let content_type = content.content_type.to_string();
        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        sqlx::query(
            r#"
            DELETE FROM content_tags
            WHERE content_type = ? AND content_id = ?
              AND tag_id IN (SELECT id FROM tags WHERE owner_id = ?)
            "#,
        )
        .bind(&content_type)
        .bind(content.content_id)
        .bind(owner_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear content tags")?;

        for name in names {
            sqlx::query(
                "INSERT OR IGNORE INTO tags (owner_id, name, color, created_at) VALUES (?, ?, NULL, ?)",
            )
            .bind(owner_id)
            .bind(name)
            .bind(now)
            .execute(&mut *tx)
            .await
            .context("Failed to create tag")?;

            let tag_id: i64 = sqlx::query("SELECT id FROM tags WHERE owner_id = ? AND name = ?")
                .bind(owner_id)
                .bind(name)
                .fetch_one(&mut *tx)
                .await
                .context("Failed to load tag")?
                .try_get("id")?;

            sqlx::query(
                "INSERT OR IGNORE INTO content_tags (tag_id, content_type, content_id) VALUES (?, ?, ?)",
            )
            .bind(tag_id)
            .bind(&content_type)
            .bind(content.content_id)
            .execute(&mut *tx)
            .await
            .context("Failed to link tag")?;
        }

        tx.commit().await?;
        Ok(())
    }
}

fn row_to_tag(row: &sqlx::sqlite::SqliteRow) -> Result<Tag> {
    Ok(Tag {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        name: row.try_get("name")?,
        color: row.try_get("color")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (DbPool, SqlxTagRepository, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let owner = sqlx::query("INSERT INTO users (username, email) VALUES ('tagger', 'tg@example.com')")
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();
        (pool.clone(), SqlxTagRepository::new(pool), owner)
    }

    async fn create_post(pool: &DbPool, author: i64) -> i64 {
        sqlx::query("INSERT INTO posts (author_id, title, content) VALUES (?, 't', 'c')")
            .bind(author)
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    fn post(id: i64) -> TaggedContent {
        TaggedContent {
            content_type: ContentType::Post,
            content_id: id,
        }
    }

    #[test]
    fn test_split_tag_names() {
        assert!(split_tag_names(None).is_empty());
        let raw = format!("rust{}async{}rust", TAG_SEPARATOR, TAG_SEPARATOR);
        assert_eq!(split_tag_names(Some(raw)), vec!["async", "rust"]);
    }

    #[tokio::test]
    async fn test_name_unique_per_owner() {
        let (pool, repo, owner) = setup().await;
        repo.create(&Tag::new(owner, "rust".to_string(), None)).await.unwrap();
        assert!(repo.create(&Tag::new(owner, "rust".to_string(), None)).await.is_err());

        let other = sqlx::query("INSERT INTO users (username, email) VALUES ('other', 'x@example.com')")
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();
        assert!(repo.create(&Tag::new(other, "rust".to_string(), None)).await.is_ok());
    }

    #[tokio::test]
    async fn test_attach_detach_and_counts() {
        let (pool, repo, owner) = setup().await;
        let tag = repo.create(&Tag::new(owner, "web".to_string(), None)).await.unwrap();
        let post_id = create_post(&pool, owner).await;

        repo.attach(tag.id, post(post_id)).await.unwrap();
        repo.attach(tag.id, post(post_id)).await.unwrap();

        let tags = repo.list_by_owner(owner).await.unwrap();
        assert_eq!(tags[0].usage_count, 1);
        assert_eq!(repo.list_content(tag.id).await.unwrap(), vec![post(post_id)]);

        assert!(repo.detach(tag.id, post(post_id)).await.unwrap());
        assert!(!repo.detach(tag.id, post(post_id)).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_content_tags_replaces() {
        let (pool, repo, owner) = setup().await;
        let post_id = create_post(&pool, owner).await;

        repo.set_content_tags(owner, post(post_id), &["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        repo.set_content_tags(owner, post(post_id), &["b".to_string(), "c".to_string()])
            .await
            .unwrap();

        let names: Vec<(String, i64)> = repo
            .list_by_owner(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|t| (t.tag.name, t.usage_count))
            .collect();
        assert!(names.contains(&("a".to_string(), 0)));
        assert!(names.contains(&("b".to_string(), 1)));
        assert!(names.contains(&("c".to_string(), 1)));
    }

    #[tokio::test]
    async fn test_list_content_skips_deleted() {
        let (pool, repo, owner) = setup().await;
        let tag = repo.create(&Tag::new(owner, "old".to_string(), None)).await.unwrap();
        let post_id = create_post(&pool, owner).await;
        repo.attach(tag.id, post(post_id)).await.unwrap();

        sqlx::query("UPDATE posts SET is_deleted = 1 WHERE id = ?")
            .bind(post_id)
            .execute(&pool)
            .await
            .unwrap();
        assert!(repo.list_content(tag.id).await.unwrap().is_empty());
    }
}
