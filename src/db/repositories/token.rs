//! Email verification and password reset tokens

use crate::db::{begin_write, DbPool};
use crate::models::{EmailVerification, PasswordReset};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Store a verification token hash, replacing older ones for the user
    async fn create_email_verification(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn get_email_verification(&self, token_hash: &str) -> Result<Option<EmailVerification>>;

    async fn delete_email_verifications(&self, user_id: i64) -> Result<()>;

    async fn create_password_reset(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn get_password_reset(&self, token_hash: &str) -> Result<Option<PasswordReset>>;

    /// Mark a reset token used. Returns false if it was already used.
    async fn mark_password_reset_used(&self, id: i64) -> Result<bool>;
}

pub struct SqlxTokenRepository {
    pool: DbPool,
}

impl SqlxTokenRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn TokenRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TokenRepository for SqlxTokenRepository {
    async fn create_email_verification(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = begin_write(&self.pool).await?;

        sqlx::query("DELETE FROM email_verifications WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear old verification tokens")?;

        sqlx::query(
            "INSERT INTO email_verifications (user_id, token_hash, expires_at, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .context("Failed to store verification token")?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_email_verification(&self, token_hash: &str) -> Result<Option<EmailVerification>> {
        let row = sqlx::query(
            "SELECT id, user_id, token_hash, expires_at, created_at \
             FROM email_verifications WHERE token_hash = ?",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load verification token")?;

        match row {
            Some(row) => Ok(Some(EmailVerification {
                id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
                token_hash: row.try_get("token_hash")?,
                expires_at: row.try_get("expires_at")?,
                created_at: row.try_get("created_at")?,
            })),
            None => Ok(None),
        }
    }

    async fn delete_email_verifications(&self, user_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM email_verifications WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete verification tokens")?;
        Ok(())
    }

    async fn create_password_reset(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO password_resets (user_id, token_hash, expires_at, used, created_at) \
             VALUES (?, ?, ?, 0, ?)",
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("Failed to store password reset token")?;
        Ok(())
    }

    async fn get_password_reset(&self, token_hash: &str) -> Result<Option<PasswordReset>> {
        let row = sqlx::query(
            "SELECT id, user_id, token_hash, expires_at, used, created_at \
             FROM password_resets WHERE token_hash = ?",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load password reset token")?;

        match row {
            Some(row) => Ok(Some(PasswordReset {
                id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
                token_hash: row.try_get("token_hash")?,
                expires_at: row.try_get("expires_at")?,
                used: row.try_get("used")?,
                created_at: row.try_get("created_at")?,
            })),
            None => Ok(None),
        }
    }

    async fn mark_password_reset_used(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE password_resets SET used = 1 WHERE id = ? AND used = 0")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to mark password reset used")?;
        Ok(result.rows_affected() == 1)
    }
}
