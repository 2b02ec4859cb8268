//! Collection repository
//!
//! Collections, their items and their collaborators.

use crate::db::{begin_write, DbPool};
use crate::models::{
    Collaborator, CollaboratorRole, Collection, CollectionItem, ContentType, ListParams,
    PagedResult,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait CollectionRepository: Send + Sync {
    async fn create(
        &self,
        owner_id: i64,
        name: &str,
        description: Option<&str>,
        is_public: bool,
    ) -> Result<Collection>;

    /// Get a non-deleted collection
    async fn get_by_id(&self, id: i64) -> Result<Option<Collection>>;

    /// Whether the owner has another live collection called `name`
    async fn name_taken(&self, owner_id: i64, name: &str, except_id: Option<i64>) -> Result<bool>;

    async fn update(
        &self,
        id: i64,
        name: &str,
        description: Option<&str>,
        is_public: bool,
    ) -> Result<()>;

    async fn soft_delete(&self, id: i64) -> Result<()>;

    /// Collections the user owns or collaborates on, most recently updated first
    async fn list_for_user(&self, user_id: i64, params: &ListParams)
        -> Result<PagedResult<Collection>>;

    /// Returns false if the item is already in the collection
    async fn add_item(
        &self,
        collection_id: i64,
        item_type: ContentType,
        item_id: i64,
        added_by: i64,
    ) -> Result<bool>;

    /// Returns false if the item was not in the collection
    async fn remove_item(&self, collection_id: i64, item_type: ContentType, item_id: i64)
        -> Result<bool>;

    async fn list_items(&self, collection_id: i64) -> Result<Vec<CollectionItem>>;

    async fn get_collaborator(&self, collection_id: i64, user_id: i64)
        -> Result<Option<Collaborator>>;

    /// Add or change a collaborator's role
    async fn upsert_collaborator(
        &self,
        collection_id: i64,
        user_id: i64,
        role: CollaboratorRole,
    ) -> Result<()>;

    async fn remove_collaborator(&self, collection_id: i64, user_id: i64) -> Result<bool>;

    async fn list_collaborators(&self, collection_id: i64) -> Result<Vec<Collaborator>>;
}

pub struct SqlxCollectionRepository {
    pool: DbPool,
}

impl SqlxCollectionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn CollectionRepository> {
        Arc::new(Self::new(pool))
    }
}

const COLLECTION_SELECT: &str = r#"
    SELECT c.id, c.owner_id, c.name, c.description, c.is_public, c.is_deleted,
           c.created_at, c.updated_at,
           (SELECT COUNT(*) FROM collection_items ci WHERE ci.collection_id = c.id) AS items_count
    FROM collections c
"#;

const COLLABORATOR_SELECT: &str = r#"
    SELECT cc.id, cc.collection_id, cc.user_id, u.username, cc.role, cc.created_at
    FROM collection_collaborators cc
    JOIN users u ON u.id = cc.user_id
"#;

#[async_trait]
impl CollectionRepository for SqlxCollectionRepository {
    async fn create(
        &self,
        owner_id: i64,
        name: &str,
        description: Option<&str>,
        is_public: bool,
    ) -> Result<Collection> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO collections (owner_id, name, description, is_public, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(owner_id)
        .bind(name)
        .bind(description)
        .bind(is_public)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create collection")?;

        Ok(Collection {
            id: result.last_insert_rowid(),
            owner_id,
            name: name.to_string(),
            description: description.map(str::to_string),
            is_public,
            items_count: 0,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Collection>> {
        let sql = format!("{} WHERE c.id = ? AND c.is_deleted = 0", COLLECTION_SELECT);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get collection")?;

        row.as_ref().map(row_to_collection).transpose()
    }

    async fn name_taken(&self, owner_id: i64, name: &str, except_id: Option<i64>) -> Result<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM collections \
             WHERE owner_id = ? AND name = ? AND is_deleted = 0 AND (? IS NULL OR id != ?)",
        )
        .bind(owner_id)
        .bind(name)
        .bind(except_id)
        .bind(except_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to check collection name")?;
        Ok(row.is_some())
    }

    async fn update(
        &self,
        id: i64,
        name: &str,
        description: Option<&str>,
        is_public: bool,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE collections SET name = ?, description = ?, is_public = ?, updated_at = ? WHERE id = ?",
        )
        .bind(name)
        .bind(description)
        .bind(is_public)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to update collection")?;
        Ok(())
    }

    async fn soft_delete(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE collections SET is_deleted = 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete collection")?;
        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<Collection>> {
        let filter = r#"
            WHERE c.is_deleted = 0
              AND (c.owner_id = ? OR EXISTS (
                    SELECT 1 FROM collection_collaborators cc
                     WHERE cc.collection_id = c.id AND cc.user_id = ?))
        "#;
        let sql = format!(
            "{} {} ORDER BY c.updated_at DESC, c.id DESC LIMIT ? OFFSET ?",
            COLLECTION_SELECT, filter
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(user_id)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list collections")?;

        let count_sql = format!("SELECT COUNT(*) AS count FROM collections c {}", filter);
        let total: i64 = sqlx::query(&count_sql)
            .bind(user_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count collections")?
            .try_get("count")?;

        let items = rows.iter().map(row_to_collection).collect::<Result<Vec<_>>>()?;
        Ok(PagedResult::new(items, total, params))
    }

    async fn add_item(
        &self,
        collection_id: i64,
        item_type: ContentType,
        item_id: i64,
        added_by: i64,
    ) -> Result<bool> {
        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO collection_items (collection_id, item_type, item_id, added_by, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(collection_id)
        .bind(item_type.to_string())
        .bind(item_id)
        .bind(added_by)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to add collection item")?
        .rows_affected()
            == 1;

        if inserted {
            sqlx::query("UPDATE collections SET updated_at = ? WHERE id = ?")
                .bind(now)
                .bind(collection_id)
                .execute(&mut *tx)
                .await
                .context("Failed to touch collection")?;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn remove_item(
        &self,
        collection_id: i64,
        item_type: ContentType,
        item_id: i64,
    ) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM collection_items WHERE collection_id = ? AND item_type = ? AND item_id = ?",
        )
        .bind(collection_id)
        .bind(item_type.to_string())
        .bind(item_id)
        .execute(&self.pool)
        .await
        .context("Failed to remove collection item")?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_items(&self, collection_id: i64) -> Result<Vec<CollectionItem>> {
        let rows = sqlx::query(
            "SELECT id, collection_id, item_type, item_id, added_by, created_at \
             FROM collection_items WHERE collection_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(collection_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list collection items")?;

        rows.iter()
            .map(|row| {
                Ok(CollectionItem {
                    id: row.try_get("id")?,
                    collection_id: row.try_get("collection_id")?,
                    item_type: row.try_get::<String, _>("item_type")?.parse()?,
                    item_id: row.try_get("item_id")?,
                    added_by: row.try_get("added_by")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn get_collaborator(
        &self,
        collection_id: i64,
        user_id: i64,
    ) -> Result<Option<Collaborator>> {
        let sql = format!(
            "{} WHERE cc.collection_id = ? AND cc.user_id = ?",
            COLLABORATOR_SELECT
        );
        let row = sqlx::query(&sql)
            .bind(collection_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get collaborator")?;

        row.as_ref().map(row_to_collaborator).transpose()
    }

    async fn upsert_collaborator(
        &self,
        collection_id: i64,
        user_id: i64,
        role: CollaboratorRole,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO collection_collaborators (collection_id, user_id, role, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(collection_id, user_id) DO UPDATE SET role = excluded.role
            "#,
        )
        .bind(collection_id)
        .bind(user_id)
        .bind(role.to_string())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("Failed to add collaborator")?;
        Ok(())
    }

    async fn remove_collaborator(&self, collection_id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM collection_collaborators WHERE collection_id = ? AND user_id = ?",
        )
        .bind(collection_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .context("Failed to remove collaborator")?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_collaborators(&self, collection_id: i64) -> Result<Vec<Collaborator>> {
        let sql = format!(
            "{} WHERE cc.collection_id = ? ORDER BY cc.created_at ASC, cc.id ASC",
            COLLABORATOR_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(collection_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list collaborators")?;

        rows.iter().map(row_to_collaborator).collect()
    }
}

fn row_to_collection(row: &sqlx::sqlite::SqliteRow) -> Result<Collection> {
    Ok(Collection {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        is_public: row.try_get("is_public")?,
        items_count: row.try_get("items_count")?,
        is_deleted: row.try_get("is_deleted")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_collaborator(row: &sqlx::sqlite::SqliteRow) -> Result<Collaborator> {
    Ok(Collaborator {
        id: row.try_get("id")?,
        collection_id: row.try_get("collection_id")?,
        user_id: row.try_get("user_id")?,
        username: row.try_get("username")?,
        role: row.try_get::<String, _>("role")?.parse()?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (DbPool, SqlxCollectionRepository, i64, i64) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let owner = sqlx::query("INSERT INTO users (username, email) VALUES ('curator', 'c@example.com')")
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();
        let friend = sqlx::query("INSERT INTO users (username, email) VALUES ('friend', 'f@example.com')")
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();
        (pool.clone(), SqlxCollectionRepository::new(pool), owner, friend)
    }

    #[tokio::test]
    async fn test_name_unique_among_live_collections() {
        let (_pool, repo, owner, _friend) = setup().await;
        let first = repo.create(owner, "reading", None, false).await.unwrap();
        assert!(repo.name_taken(owner, "reading", None).await.unwrap());
        assert!(!repo.name_taken(owner, "reading", Some(first.id)).await.unwrap());

        repo.soft_delete(first.id).await.unwrap();
        assert!(!repo.name_taken(owner, "reading", None).await.unwrap());
        assert!(repo.create(owner, "reading", None, false).await.is_ok());
    }

    #[tokio::test]
    async fn test_items_are_unique() {
        let (_pool, repo, owner, _friend) = setup().await;
        let collection = repo.create(owner, "stuff", None, true).await.unwrap();

        assert!(repo.add_item(collection.id, ContentType::Post, 1, owner).await.unwrap());
        assert!(!repo.add_item(collection.id, ContentType::Post, 1, owner).await.unwrap());
        assert!(repo.add_item(collection.id, ContentType::Issue, 1, owner).await.unwrap());

        let fetched = repo.get_by_id(collection.id).await.unwrap().unwrap();
        assert_eq!(fetched.items_count, 2);

        assert!(repo.remove_item(collection.id, ContentType::Post, 1).await.unwrap());
        assert_eq!(repo.list_items(collection.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_shared_collections_are_listed() {
        let (_pool, repo, owner, friend) = setup().await;
        let collection = repo.create(owner, "shared", None, false).await.unwrap();
        repo.create(owner, "private", None, false).await.unwrap();

        repo.upsert_collaborator(collection.id, friend, CollaboratorRole::Viewer)
            .await
            .unwrap();
        repo.upsert_collaborator(collection.id, friend, CollaboratorRole::Editor)
            .await
            .unwrap();

        let collaborator = repo.get_collaborator(collection.id, friend).await.unwrap().unwrap();
        assert_eq!(collaborator.role, CollaboratorRole::Editor);
        assert_eq!(collaborator.username, "friend");

        let listed = repo.list_for_user(friend, &ListParams::default()).await.unwrap();
        assert_eq!(listed.total, 1);
        assert_eq!(listed.items[0].name, "shared");

        assert!(repo.remove_collaborator(collection.id, friend).await.unwrap());
        let listed = repo.list_for_user(friend, &ListParams::default()).await.unwrap();
        assert_eq!(listed.total, 0);
    }
}
