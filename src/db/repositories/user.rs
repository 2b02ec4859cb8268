//! User repository
//!
//! Database operations for users.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite

use crate::db::DbPool;
use crate::models::{ListParams, PagedResult, User, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

/// OAuth identity providers a user can be linked to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderColumn {
    Github,
    Google,
}

impl ProviderColumn {
    fn column(&self) -> &'static str {
        match self {
            ProviderColumn::Github => "github_id",
            ProviderColumn::Google => "google_id",
        }
    }
}

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID, including soft-deleted users
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Get user by email (case-insensitive)
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Get user by linked OAuth provider id
    async fn get_by_provider_id(&self, provider: ProviderColumn, id: &str) -> Result<Option<User>>;

    /// Persist every mutable column of `user`
    async fn update(&self, user: &User) -> Result<User>;

    /// Replace the password hash
    async fn set_password(&self, id: i64, password_hash: &str) -> Result<()>;

    /// Mark the email address as verified
    async fn mark_email_verified(&self, id: i64) -> Result<()>;

    /// Soft-delete or restore
    async fn set_deleted(&self, id: i64, deleted: bool) -> Result<()>;

    /// Count all users, deleted or not
    async fn count(&self) -> Result<i64>;

    /// List users, newest first, optionally filtered by a username/email substring
    async fn list(&self, search: Option<&str>, params: &ListParams) -> Result<PagedResult<User>>;

    /// Top users by contributor score, excluding deleted users
    async fn leaderboard(&self, limit: i64) -> Result<Vec<User>>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DbPool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DbPool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, role, display_name, bio, \
    avatar_url, github_id, google_id, is_email_verified, contributor_score, is_deleted, \
    created_at, updated_at";

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, role, display_name, avatar_url,
                               github_id, google_id, is_email_verified, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.to_string())
        .bind(&user.display_name)
        .bind(&user.avatar_url)
        .bind(&user.github_id)
        .bind(&user.google_id)
        .bind(user.is_email_verified)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create user")?;

        Ok(User {
            id: result.last_insert_rowid(),
            created_at: now,
            updated_at: now,
            ..user.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get user by ID")?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get user by username")?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER(?)",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get user by email")?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_by_provider_id(&self, provider: ProviderColumn, id: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE {} = ?",
            USER_COLUMNS,
            provider.column()
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get user by provider id")?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn update(&self, user: &User) -> Result<User> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE users
            SET email = ?, password_hash = ?, role = ?, display_name = ?, bio = ?, avatar_url = ?,
                github_id = ?, google_id = ?, is_email_verified = ?, is_deleted = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.to_string())
        .bind(&user.display_name)
        .bind(&user.bio)
        .bind(&user.avatar_url)
        .bind(&user.github_id)
        .bind(&user.google_id)
        .bind(user.is_email_verified)
        .bind(user.is_deleted)
        .bind(now)
        .bind(user.id)
        .execute(&self.pool)
        .await
        .context("Failed to update user")?;

        Ok(User {
            updated_at: now,
            ..user.clone()
        })
    }

    async fn set_password(&self, id: i64, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update password")?;
        Ok(())
    }

    async fn mark_email_verified(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE users SET is_email_verified = 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to mark email verified")?;
        Ok(())
    }

    async fn set_deleted(&self, id: i64, deleted: bool) -> Result<()> {
        sqlx::query("UPDATE users SET is_deleted = ?, updated_at = ? WHERE id = ?")
            .bind(deleted)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update user deleted flag")?;
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM users")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count users")?;
        Ok(row.try_get("count")?)
    }

    async fn list(&self, search: Option<&str>, params: &ListParams) -> Result<PagedResult<User>> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()));

        let sql = format!(
            r#"
            SELECT {}
            FROM users
            WHERE (? IS NULL OR LOWER(username) LIKE ? OR LOWER(email) LIKE ?)
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
            USER_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list users")?;

        let total: i64 = sqlx::query(
            "SELECT COUNT(*) as count FROM users \
             WHERE (? IS NULL OR LOWER(username) LIKE ? OR LOWER(email) LIKE ?)",
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count users")?
        .try_get("count")?;

        let users = rows.iter().map(row_to_user).collect::<Result<Vec<_>>>()?;
        Ok(PagedResult::new(users, total, params))
    }

    async fn leaderboard(&self, limit: i64) -> Result<Vec<User>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM users
            WHERE is_deleted = 0
            ORDER BY contributor_score DESC, id ASC
            LIMIT ?
            "#,
            USER_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .context("Failed to load leaderboard")?;

        rows.iter().map(row_to_user).collect()
    }
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: role.parse::<UserRole>()?,
        display_name: row.try_get("display_name")?,
        bio: row.try_get("bio")?,
        avatar_url: row.try_get("avatar_url")?,
        github_id: row.try_get("github_id")?,
        google_id: row.try_get("google_id")?,
        is_email_verified: row.try_get("is_email_verified")?,
        contributor_score: row.try_get("contributor_score")?,
        is_deleted: row.try_get("is_deleted")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxUserRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxUserRepository::new(pool)
    }

    fn test_user(username: &str) -> User {
        User::new(
            username.to_string(),
            format!("{}@example.com", username),
            Some("hash".to_string()),
            UserRole::User,
        )
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let repo = setup_test_repo().await;
        let created = repo.create(&test_user("alice")).await.expect("create");

        assert!(created.id > 0);
        let found = repo.get_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.role, UserRole::User);
        assert_eq!(found.password_hash.as_deref(), Some("hash"));

        let by_email = repo.get_by_email("ALICE@example.com").await.unwrap();
        assert!(by_email.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_username_fails() {
        let repo = setup_test_repo().await;
        repo.create(&test_user("bob")).await.unwrap();
        let mut dup = test_user("bob");
        dup.email = "other@example.com".to_string();

        let err = repo.create(&dup).await.unwrap_err();
        assert!(super::super::target::is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_provider_lookup() {
        let repo = setup_test_repo().await;
        let mut user = test_user("carol");
        user.github_id = Some("1234".to_string());
        repo.create(&user).await.unwrap();

        let found = repo
            .get_by_provider_id(ProviderColumn::Github, "1234")
            .await
            .unwrap();
        assert_eq!(found.unwrap().username, "carol");
        assert!(repo
            .get_by_provider_id(ProviderColumn::Google, "1234")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_list_with_search() {
        let repo = setup_test_repo().await;
        for name in ["dave", "dana", "erin"] {
            repo.create(&test_user(name)).await.unwrap();
        }

        let all = repo.list(None, &ListParams::default()).await.unwrap();
        assert_eq!(all.total, 3);

        let filtered = repo.list(Some("da"), &ListParams::default()).await.unwrap();
        assert_eq!(filtered.total, 2);
        assert!(filtered.items.iter().all(|u| u.username.starts_with("da")));
    }

    #[tokio::test]
    async fn test_leaderboard_skips_deleted() {
        let repo = setup_test_repo().await;
        let a = repo.create(&test_user("a_user")).await.unwrap();
        let b = repo.create(&test_user("b_user")).await.unwrap();
        for (id, score) in [(a.id, 10), (b.id, 50)] {
            sqlx::query("UPDATE users SET contributor_score = ? WHERE id = ?")
                .bind(score)
                .bind(id)
                .execute(&repo.pool)
                .await
                .unwrap();
        }

        let board = repo.leaderboard(10).await.unwrap();
        assert_eq!(board[0].id, b.id);

        repo.set_deleted(b.id, true).await.unwrap();
        let board = repo.leaderboard(10).await.unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].id, a.id);
    }
}
