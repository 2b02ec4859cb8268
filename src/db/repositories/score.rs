//! Contributor score queries

use crate::db::DbPool;
use crate::models::Contributions;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait ScoreRepository: Send + Sync {
    /// Count a user's non-deleted issues, solutions, accepted solutions and comments
    async fn contributions(&self, user_id: i64) -> Result<Contributions>;

    async fn store_score(&self, user_id: i64, score: i64) -> Result<()>;
}

pub struct SqlxScoreRepository {
    pool: DbPool,
}

impl SqlxScoreRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn ScoreRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ScoreRepository for SqlxScoreRepository {
    async fn contributions(&self, user_id: i64) -> Result<Contributions> {
        let row = sqlx::query(
            r#"
            SELECT
              (SELECT COUNT(*) FROM issues WHERE author_id = ? AND is_deleted = 0) AS issues,
              (SELECT COUNT(*) FROM solutions WHERE author_id = ? AND is_deleted = 0) AS solutions,
              (SELECT COUNT(*) FROM solutions
                WHERE author_id = ? AND is_deleted = 0 AND is_accepted = 1) AS accepted,
              (SELECT COUNT(*) FROM comments WHERE author_id = ? AND is_deleted = 0) AS comments
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count contributions")?;

        Ok(Contributions {
            issues: row.try_get("issues")?,
            solutions: row.try_get("solutions")?,
            accepted_solutions: row.try_get("accepted")?,
            comments: row.try_get("comments")?,
        })
    }

    async fn store_score(&self, user_id: i64, score: i64) -> Result<()> {
        sqlx::query("UPDATE users SET contributor_score = ? WHERE id = ?")
            .bind(score)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to store contributor score")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    #[tokio::test]
    async fn test_contributions_ignore_deleted_rows() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxScoreRepository::new(pool.clone());

        let user = sqlx::query("INSERT INTO users (username, email) VALUES ('u', 'u@example.com')")
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();
        let issue = sqlx::query("INSERT INTO issues (author_id, title, description) VALUES (?, 't', 'd')")
            .bind(user)
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();
        sqlx::query("INSERT INTO issues (author_id, title, description, is_deleted) VALUES (?, 't', 'd', 1)")
            .bind(user)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO solutions (issue_id, author_id, content, is_accepted) VALUES (?, ?, 's', 1)")
            .bind(issue)
            .bind(user)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO comments (author_id, target_type, target_id, content) VALUES (?, 'issue', ?, 'c')")
            .bind(user)
            .bind(issue)
            .execute(&pool)
            .await
            .unwrap();

        let contributions = repo.contributions(user).await.unwrap();
        assert_eq!(
            contributions,
            Contributions {
                issues: 1,
                solutions: 1,
                accepted_solutions: 1,
                comments: 1,
            }
        );
        assert_eq!(contributions.score(), 2 + 5 + 15 + 1);
    }
}
