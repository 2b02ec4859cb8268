//! Post repository
//!
//! Database operations for posts. Listing excludes soft-deleted rows and is
//! ordered newest first.

use crate::db::DbPool;
use crate::models::{ListParams, PagedResult, Post, PostFilter, ReactionTally};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

use super::tag::split_tag_names;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, author_id: i64, title: &str, content: &str) -> Result<Post>;

    /// Get a non-deleted post
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    async fn update(&self, id: i64, title: &str, content: &str) -> Result<()>;

    async fn soft_delete(&self, id: i64) -> Result<()>;

    async fn list(&self, filter: &PostFilter, params: &ListParams) -> Result<PagedResult<Post>>;

    async fn increment_views(&self, id: i64) -> Result<()>;
}

pub struct SqlxPostRepository {
    pool: DbPool,
}

impl SqlxPostRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

const POST_SELECT: &str = r#"
    SELECT p.id, p.author_id, u.username AS author_username, p.title, p.content,
           p.views_count, p.comments_count, p.reactions_count, p.reaction_counts,
           p.is_deleted, p.created_at, p.updated_at,
           (SELECT GROUP_CONCAT(t.name, char(31))
              FROM content_tags ct JOIN tags t ON t.id = ct.tag_id
             WHERE ct.content_type = 'post' AND ct.content_id = p.id) AS tag_names
    FROM posts p
    JOIN users u ON u.id = p.author_id
"#;

const POST_FILTER: &str = r#"
    WHERE p.is_deleted = 0
      AND (? IS NULL OR p.author_id = ?)
      AND (? IS NULL OR EXISTS (
            SELECT 1 FROM content_tags ct JOIN tags t ON t.id = ct.tag_id
             WHERE ct.content_type = 'post' AND ct.content_id = p.id AND t.name = ?))
"#;

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, author_id: i64, title: &str, content: &str) -> Result<Post> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO posts (author_id, title, content, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(author_id)
        .bind(title)
        .bind(content)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create post")?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| anyhow::anyhow!("Post vanished after insert"))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let sql = format!("{} WHERE p.id = ? AND p.is_deleted = 0", POST_SELECT);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get post by ID")?;

        row.as_ref().map(row_to_post).transpose()
    }

    async fn update(&self, id: i64, title: &str, content: &str) -> Result<()> {
        sqlx::query("UPDATE posts SET title = ?, content = ?, updated_at = ? WHERE id = ?")
            .bind(title)
            .bind(content)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update post")?;
        Ok(())
    }

    async fn soft_delete(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE posts SET is_deleted = 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete post")?;
        Ok(())
    }

    async fn list(&self, filter: &PostFilter, params: &ListParams) -> Result<PagedResult<Post>> {
        let sql = format!(
            "{} {} ORDER BY p.created_at DESC, p.id DESC LIMIT ? OFFSET ?",
            POST_SELECT, POST_FILTER
        );
        let rows = sqlx::query(&sql)
            .bind(filter.author_id)
            .bind(filter.author_id)
            .bind(&filter.tag)
            .bind(&filter.tag)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list posts")?;

        let count_sql = format!("SELECT COUNT(*) AS count FROM posts p {}", POST_FILTER);
        let total: i64 = sqlx::query(&count_sql)
            .bind(filter.author_id)
            .bind(filter.author_id)
            .bind(&filter.tag)
            .bind(&filter.tag)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count posts")?
            .try_get("count")?;

        let posts = rows.iter().map(row_to_post).collect::<Result<Vec<_>>>()?;
        Ok(PagedResult::new(posts, total, params))
    }

    async fn increment_views(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE posts SET views_count = views_count + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to increment post views")?;
        Ok(())
    }
}

fn row_to_post(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    let reaction_counts: String = row.try_get("reaction_counts")?;
    let tag_names: Option<String> = row.try_get("tag_names")?;
    Ok(Post {
        id: row.try_get("id")?,
        author_id: row.try_get("author_id")?,
        author_username: row.try_get("author_username")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        views_count: row.try_get("views_count")?,
        comments_count: row.try_get("comments_count")?,
        reactions_count: row.try_get("reactions_count")?,
        reaction_counts: ReactionTally::from_json(&reaction_counts),
        tags: split_tag_names(tag_names),
        is_deleted: row.try_get("is_deleted")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (DbPool, SqlxPostRepository, i64) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let author = sqlx::query("INSERT INTO users (username, email) VALUES ('writer', 'w@example.com')")
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();
        (pool.clone(), SqlxPostRepository::new(pool), author)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (_pool, repo, author) = setup().await;
        let post = repo.create(author, "Hello", "World").await.unwrap();

        assert_eq!(post.author_username, "writer");
        assert_eq!(post.reactions_count, 0);
        assert!(post.reaction_counts.0.is_empty());
        assert!(post.tags.is_empty());
    }

    #[tokio::test]
    async fn test_soft_deleted_posts_are_hidden() {
        let (_pool, repo, author) = setup().await;
        let post = repo.create(author, "Gone", "soon").await.unwrap();
        repo.soft_delete(post.id).await.unwrap();

        assert!(repo.get_by_id(post.id).await.unwrap().is_none());
        let list = repo.list(&PostFilter::default(), &ListParams::default()).await.unwrap();
        assert_eq!(list.total, 0);
    }

    #[tokio::test]
    async fn test_list_newest_first_with_tag_filter() {
        let (pool, repo, author) = setup().await;
        let first = repo.create(author, "First", "a").await.unwrap();
        let second = repo.create(author, "Second", "b").await.unwrap();

        let tag_id = sqlx::query("INSERT INTO tags (owner_id, name) VALUES (?, 'rust')")
            .bind(author)
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();
        sqlx::query("INSERT INTO content_tags (tag_id, content_type, content_id) VALUES (?, 'post', ?)")
            .bind(tag_id)
            .bind(first.id)
            .execute(&pool)
            .await
            .unwrap();

        let all = repo.list(&PostFilter::default(), &ListParams::default()).await.unwrap();
        assert_eq!(all.items[0].id, second.id);
        assert_eq!(all.items[1].tags, vec!["rust".to_string()]);

        let filter = PostFilter {
            tag: Some("rust".to_string()),
            ..Default::default()
        };
        let tagged = repo.list(&filter, &ListParams::default()).await.unwrap();
        assert_eq!(tagged.total, 1);
        assert_eq!(tagged.items[0].id, first.id);
    }

    #[tokio::test]
    async fn test_increment_views() {
        let (_pool, repo, author) = setup().await;
        let post = repo.create(author, "Views", "x").await.unwrap();
        repo.increment_views(post.id).await.unwrap();
        repo.increment_views(post.id).await.unwrap();

        assert_eq!(repo.get_by_id(post.id).await.unwrap().unwrap().views_count, 2);
    }
}
