//! Vote repository
//!
//! `toggle` runs the whole like/dislike state machine in one transaction:
//! target check, vote row insert/delete/update, and the counter update on
//! the target. Counters never drop below zero.

use crate::db::{begin_write, DbPool};
use crate::models::{ToggleOutcome, VoteDelta, VoteResult, VoteTarget};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

use super::target::live_row_exists;

#[async_trait]
pub trait VoteRepository: Send + Sync {
    /// Apply a vote request. Returns `None` when the target is missing or deleted.
    async fn toggle(
        &self,
        user_id: i64,
        target: VoteTarget,
        target_id: i64,
        is_dislike: bool,
    ) -> Result<Option<VoteResult>>;

    /// The user's current vote polarity on a target (`Some(true)` = dislike)
    async fn get_user_vote(
        &self,
        user_id: i64,
        target: VoteTarget,
        target_id: i64,
    ) -> Result<Option<bool>>;
}

pub struct SqlxVoteRepository {
    pool: DbPool,
}

impl SqlxVoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn VoteRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl VoteRepository for SqlxVoteRepository {
    async fn toggle(
        &self,
        user_id: i64,
        target: VoteTarget,
        target_id: i64,
        is_dislike: bool,
    ) -> Result<Option<VoteResult>> {
        let now = Utc::now();
        let target_type = target.to_string();
        let mut tx = begin_write(&self.pool).await?;

        if !live_row_exists(&mut tx, target.table(), target_id).await? {
            return Ok(None);
        }

        let existing = sqlx::query(
            "SELECT id, is_dislike FROM votes WHERE user_id = ? AND target_type = ? AND target_id = ?",
        )
        .bind(user_id)
        .bind(&target_type)
        .bind(target_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to load existing vote")?;

        let existing = match existing {
            Some(row) => Some((row.try_get::<i64, _>("id")?, row.try_get::<bool, _>("is_dislike")?)),
            None => None,
        };
        let delta = VoteDelta::plan(existing.map(|(_, d)| d), is_dislike);

        match (delta.outcome, existing) {
            (ToggleOutcome::Created, _) => {
                sqlx::query(
                    "INSERT INTO votes (user_id, target_type, target_id, is_dislike, created_at, updated_at) \
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(user_id)
                .bind(&target_type)
                .bind(target_id)
                .bind(is_dislike)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await
                .context("Failed to insert vote")?;
            }
            (ToggleOutcome::Removed, Some((vote_id, _))) => {
                sqlx::query("DELETE FROM votes WHERE id = ?")
                    .bind(vote_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to delete vote")?;
            }
            (ToggleOutcome::Changed, Some((vote_id, _))) => {
                sqlx::query("UPDATE votes SET is_dislike = ?, updated_at = ? WHERE id = ?")
                    .bind(is_dislike)
                    .bind(now)
                    .bind(vote_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to update vote")?;
            }
            (outcome, None) => {
                anyhow::bail!("Vote outcome {:?} without an existing vote", outcome);
            }
        }

        let sql = format!(
            "UPDATE {} SET likes_count = MAX(0, likes_count + ?), \
             dislikes_count = MAX(0, dislikes_count + ?) WHERE id = ?",
            target.table()
        );
        sqlx::query(&sql)
            .bind(delta.likes)
            .bind(delta.dislikes)
            .bind(target_id)
            .execute(&mut *tx)
            .await
            .context("Failed to update vote counters")?;

        let counts_sql = format!(
            "SELECT likes_count, dislikes_count FROM {} WHERE id = ?",
            target.table()
        );
        let counts = sqlx::query(&counts_sql)
            .bind(target_id)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to read vote counters")?;

        tx.commit().await?;

        Ok(Some(VoteResult {
            outcome: delta.outcome,
            likes_count: counts.try_get("likes_count")?,
            dislikes_count: counts.try_get("dislikes_count")?,
            is_dislike: match delta.outcome {
                ToggleOutcome::Removed => None,
                _ => Some(is_dislike),
            },
        }))
    }

    async fn get_user_vote(
        &self,
        user_id: i64,
        target: VoteTarget,
        target_id: i64,
    ) -> Result<Option<bool>> {
        let row = sqlx::query(
            "SELECT is_dislike FROM votes WHERE user_id = ? AND target_type = ? AND target_id = ?",
        )
        .bind(user_id)
        .bind(target.to_string())
        .bind(target_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load vote")?;

        match row {
            Some(row) => Ok(Some(row.try_get("is_dislike")?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::{create_pool, create_test_pool, migrations};

    async fn setup() -> (DbPool, SqlxVoteRepository, i64, i64) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let user = sqlx::query("INSERT INTO users (username, email) VALUES ('voter', 'v@example.com')")
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();
        let issue = sqlx::query("INSERT INTO issues (author_id, title, description) VALUES (?, 'i', 'd')")
            .bind(user)
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();
        (pool.clone(), SqlxVoteRepository::new(pool), user, issue)
    }

    #[tokio::test]
    async fn test_vote_created_changed_removed() {
        let (_pool, repo, user, issue) = setup().await;

        let result = repo.toggle(user, VoteTarget::Issue, issue, false).await.unwrap().unwrap();
        assert_eq!(result.outcome, ToggleOutcome::Created);
        assert_eq!((result.likes_count, result.dislikes_count), (1, 0));

        let result = repo.toggle(user, VoteTarget::Issue, issue, true).await.unwrap().unwrap();
        assert_eq!(result.outcome, ToggleOutcome::Changed);
        assert_eq!((result.likes_count, result.dislikes_count), (0, 1));
        assert_eq!(repo.get_user_vote(user, VoteTarget::Issue, issue).await.unwrap(), Some(true));

        let result = repo.toggle(user, VoteTarget::Issue, issue, true).await.unwrap().unwrap();
        assert_eq!(result.outcome, ToggleOutcome::Removed);
        assert_eq!((result.likes_count, result.dislikes_count), (0, 0));
        assert_eq!(repo.get_user_vote(user, VoteTarget::Issue, issue).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_vote_on_missing_or_deleted_target() {
        let (pool, repo, user, issue) = setup().await;
        assert!(repo.toggle(user, VoteTarget::Solution, 77, false).await.unwrap().is_none());

        sqlx::query("UPDATE issues SET is_deleted = 1 WHERE id = ?")
            .bind(issue)
            .execute(&pool)
            .await
            .unwrap();
        assert!(repo.toggle(user, VoteTarget::Issue, issue, false).await.unwrap().is_none());

        let votes: i64 = sqlx::query("SELECT COUNT(*) AS c FROM votes")
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("c");
        assert_eq!(votes, 0);
    }

    #[tokio::test]
    async fn test_counters_never_negative() {
        let (pool, repo, user, issue) = setup().await;
        repo.toggle(user, VoteTarget::Issue, issue, false).await.unwrap();
        // Simulate drift in the denormalized counter
        sqlx::query("UPDATE issues SET likes_count = 0 WHERE id = ?")
            .bind(issue)
            .execute(&pool)
            .await
            .unwrap();

        let result = repo.toggle(user, VoteTarget::Issue, issue, false).await.unwrap().unwrap();
        assert_eq!(result.outcome, ToggleOutcome::Removed);
        assert_eq!(result.likes_count, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_votes_all_count() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pool = create_pool(&DatabaseConfig {
            url: temp_dir.path().join("votes.db").to_string_lossy().to_string(),
            max_connections: 8,
        })
        .await
        .unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let author = sqlx::query("INSERT INTO users (username, email) VALUES ('asker', 'a@example.com')")
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();
        let issue = sqlx::query("INSERT INTO issues (author_id, title, description) VALUES (?, 'i', 'd')")
            .bind(author)
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();

        let repo = Arc::new(SqlxVoteRepository::new(pool.clone()));
        let mut handles = Vec::new();
        for i in 0..40 {
            let user = sqlx::query("INSERT INTO users (username, email) VALUES (?, ?)")
                .bind(format!("voter{}", i))
                .bind(format!("voter{}@example.com", i))
                .execute(&pool)
                .await
                .unwrap()
                .last_insert_rowid();
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.toggle(user, VoteTarget::Issue, issue, false).await
            }));
        }
        for handle in handles {
            let result = handle.await.unwrap().expect("vote should not fail under contention");
            assert!(result.is_some());
        }

        let likes: i64 = sqlx::query_scalar("SELECT likes_count FROM issues WHERE id = ?")
            .bind(issue)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(likes, 40);
    }
}
