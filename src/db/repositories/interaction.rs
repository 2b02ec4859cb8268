//! Interaction (reaction) repository
//!
//! Same transaction shape as votes: the reaction row and the target's
//! `reactions_count` / `reaction_counts` tally change together.

use crate::db::{begin_write, DbPool};
use crate::models::{
    plan_reaction, ReactionResult, ReactionSummary, ReactionTally, ReactionTarget, ReactionType,
    ToggleOutcome,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

use super::target::live_row_exists;

#[async_trait]
pub trait InteractionRepository: Send + Sync {
    /// Apply a reaction request. Returns `None` when the target is missing or deleted.
    async fn toggle(
        &self,
        user_id: i64,
        target: ReactionTarget,
        target_id: i64,
        reaction: ReactionType,
    ) -> Result<Option<ReactionResult>>;

    /// Counters of a non-deleted target plus the viewer's own reaction
    async fn summary(
        &self,
        viewer_id: Option<i64>,
        target: ReactionTarget,
        target_id: i64,
    ) -> Result<Option<ReactionSummary>>;

    async fn get_user_reaction(
        &self,
        user_id: i64,
        target: ReactionTarget,
        target_id: i64,
    ) -> Result<Option<ReactionType>>;
}

pub struct SqlxInteractionRepository {
    pool: DbPool,
}

impl SqlxInteractionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn InteractionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl InteractionRepository for SqlxInteractionRepository {
    async fn toggle(
        &self,
        user_id: i64,
        target: ReactionTarget,
        target_id: i64,
        reaction: ReactionType,
    ) -> Result<Option<ReactionResult>> {
        let now = Utc::now();
        let target_type = target.to_string();
        let mut tx = begin_write(&self.pool).await?;

        if !live_row_exists(&mut tx, target.table(), target_id).await? {
            return Ok(None);
        }

        let existing = sqlx::query(
            "SELECT id, reaction_type FROM interactions \
             WHERE user_id = ? AND target_type = ? AND target_id = ?",
        )
        .bind(user_id)
        .bind(&target_type)
        .bind(target_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to load existing reaction")?;

        let existing: Option<(i64, ReactionType)> = match existing {
            Some(row) => Some((
                row.try_get("id")?,
                row.try_get::<String, _>("reaction_type")?.parse()?,
            )),
            None => None,
        };

        let counters_sql = format!(
            "SELECT reactions_count, reaction_counts FROM {} WHERE id = ?",
            target.table()
        );
        let counters = sqlx::query(&counters_sql)
            .bind(target_id)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to read reaction counters")?;
        let mut total: i64 = counters.try_get("reactions_count")?;
        let mut tally = ReactionTally::from_json(&counters.try_get::<String, _>("reaction_counts")?);

        let outcome = plan_reaction(existing.map(|(_, r)| r), reaction);
        match (outcome, existing) {
            (ToggleOutcome::Created, _) => {
                sqlx::query(
                    "INSERT INTO interactions (user_id, target_type, target_id, reaction_type, created_at, updated_at) \
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(user_id)
                .bind(&target_type)
                .bind(target_id)
                .bind(reaction.to_string())
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await
                .context("Failed to insert reaction")?;
                total += 1;
                tally.increment(reaction);
            }
            (ToggleOutcome::Removed, Some((id, _))) => {
                sqlx::query("DELETE FROM interactions WHERE id = ?")
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to delete reaction")?;
                total = (total - 1).max(0);
                tally.decrement(reaction);
            }
            (ToggleOutcome::Changed, Some((id, previous))) => {
                sqlx::query("UPDATE interactions SET reaction_type = ?, updated_at = ? WHERE id = ?")
                    .bind(reaction.to_string())
                    .bind(now)
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to update reaction")?;
                tally.decrement(previous);
                tally.increment(reaction);
            }
            (outcome, None) => {
                anyhow::bail!("Reaction outcome {:?} without an existing reaction", outcome);
            }
        }

        let update_sql = format!(
            "UPDATE {} SET reactions_count = ?, reaction_counts = ? WHERE id = ?",
            target.table()
        );
        sqlx::query(&update_sql)
            .bind(total)
            .bind(tally.to_json())
            .bind(target_id)
            .execute(&mut *tx)
            .await
            .context("Failed to update reaction counters")?;

        tx.commit().await?;

        Ok(Some(ReactionResult {
            outcome,
            reactions_count: total,
            reaction_counts: tally,
            reaction_type: match outcome {
                ToggleOutcome::Removed => None,
                _ => Some(reaction),
            },
        }))
    }

    async fn summary(
        &self,
        viewer_id: Option<i64>,
        target: ReactionTarget,
        target_id: i64,
    ) -> Result<Option<ReactionSummary>> {
        let sql = format!(
            "SELECT reactions_count, reaction_counts FROM {} WHERE id = ? AND is_deleted = 0",
            target.table()
        );
        let row = sqlx::query(&sql)
            .bind(target_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load reaction summary")?;
        let Some(row) = row else {
            return Ok(None);
        };

        let my_reaction = match viewer_id {
            Some(user_id) => self.get_user_reaction(user_id, target, target_id).await?,
            None => None,
        };

        Ok(Some(ReactionSummary {
            reactions_count: row.try_get("reactions_count")?,
            reaction_counts: ReactionTally::from_json(&row.try_get::<String, _>("reaction_counts")?),
            my_reaction,
        }))
    }

    async fn get_user_reaction(
        &self,
        user_id: i64,
        target: ReactionTarget,
        target_id: i64,
    ) -> Result<Option<ReactionType>> {
        let row = sqlx::query(
            "SELECT reaction_type FROM interactions \
             WHERE user_id = ? AND target_type = ? AND target_id = ?",
        )
        .bind(user_id)
        .bind(target.to_string())
        .bind(target_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load reaction")?;

        match row {
            Some(row) => Ok(Some(row.try_get::<String, _>("reaction_type")?.parse()?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::{create_pool, create_test_pool, migrations};

    async fn setup() -> (DbPool, SqlxInteractionRepository, i64, i64) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let user = sqlx::query("INSERT INTO users (username, email) VALUES ('fan', 'f@example.com')")
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();
        let post = sqlx::query("INSERT INTO posts (author_id, title, content) VALUES (?, 'p', 'c')")
            .bind(user)
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();
        (pool.clone(), SqlxInteractionRepository::new(pool), user, post)
    }

    #[tokio::test]
    async fn test_react_change_remove() {
        let (_pool, repo, user, post) = setup().await;

        let result = repo
            .toggle(user, ReactionTarget::Post, post, ReactionType::Like)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.outcome, ToggleOutcome::Created);
        assert_eq!(result.reactions_count, 1);
        assert_eq!(result.reaction_counts.get(ReactionType::Like), 1);

        let result = repo
            .toggle(user, ReactionTarget::Post, post, ReactionType::Love)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.outcome, ToggleOutcome::Changed);
        assert_eq!(result.reactions_count, 1);
        assert_eq!(result.reaction_counts.get(ReactionType::Like), 0);
        assert_eq!(result.reaction_counts.get(ReactionType::Love), 1);

        let result = repo
            .toggle(user, ReactionTarget::Post, post, ReactionType::Love)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.outcome, ToggleOutcome::Removed);
        assert_eq!(result.reactions_count, 0);
        assert!(result.reaction_counts.0.is_empty());
    }

    #[tokio::test]
    async fn test_summary_with_viewer() {
        let (pool, repo, user, post) = setup().await;
        let other = sqlx::query("INSERT INTO users (username, email) VALUES ('other', 'o@example.com')")
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();
        repo.toggle(user, ReactionTarget::Post, post, ReactionType::Laugh).await.unwrap();
        repo.toggle(other, ReactionTarget::Post, post, ReactionType::Laugh).await.unwrap();

        let summary = repo
            .summary(Some(user), ReactionTarget::Post, post)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.reactions_count, 2);
        assert_eq!(summary.reaction_counts.get(ReactionType::Laugh), 2);
        assert_eq!(summary.my_reaction, Some(ReactionType::Laugh));

        let anonymous = repo.summary(None, ReactionTarget::Post, post).await.unwrap().unwrap();
        assert!(anonymous.my_reaction.is_none());
    }

    #[tokio::test]
    async fn test_react_on_missing_target() {
        let (_pool, repo, user, _post) = setup().await;
        let result = repo
            .toggle(user, ReactionTarget::Comment, 404, ReactionType::Confused)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_react_on_deleted_targets() {
        let (pool, repo, user, post) = setup().await;
        let snippet = sqlx::query(
            "INSERT INTO snippets (author_id, title, code, language) VALUES (?, 's', 'fn main() {}', 'rust')",
        )
        .bind(user)
        .execute(&pool)
        .await
        .unwrap()
        .last_insert_rowid();
        let comment = sqlx::query(
            "INSERT INTO comments (author_id, target_type, target_id, content) VALUES (?, 'post', ?, 'c')",
        )
        .bind(user)
        .bind(post)
        .execute(&pool)
        .await
        .unwrap()
        .last_insert_rowid();

        for table in ["posts", "snippets", "comments"] {
            sqlx::query(&format!("UPDATE {} SET is_deleted = 1", table))
                .execute(&pool)
                .await
                .unwrap();
        }

        for (target, id) in [
            (ReactionTarget::Post, post),
            (ReactionTarget::Snippet, snippet),
            (ReactionTarget::Comment, comment),
        ] {
            let result = repo.toggle(user, target, id, ReactionType::Like).await.unwrap();
            assert!(result.is_none(), "{} {} should be gone", target, id);
            assert!(repo.summary(Some(user), target, id).await.unwrap().is_none());
        }

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM interactions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reactions_all_count() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pool = create_pool(&DatabaseConfig {
            url: temp_dir.path().join("reactions.db").to_string_lossy().to_string(),
            max_connections: 8,
        })
        .await
        .unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let author = sqlx::query("INSERT INTO users (username, email) VALUES ('author', 'a@example.com')")
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();
        let post = sqlx::query("INSERT INTO posts (author_id, title, content) VALUES (?, 'p', 'c')")
            .bind(author)
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();

        let repo = Arc::new(SqlxInteractionRepository::new(pool.clone()));
        let mut handles = Vec::new();
        for i in 0..40 {
            let user = sqlx::query("INSERT INTO users (username, email) VALUES (?, ?)")
                .bind(format!("fan{}", i))
                .bind(format!("fan{}@example.com", i))
                .execute(&pool)
                .await
                .unwrap()
                .last_insert_rowid();
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.toggle(user, ReactionTarget::Post, post, ReactionType::Like).await
            }));
        }
        for handle in handles {
            let result = handle.await.unwrap().expect("toggle should not fail under contention");
            assert_eq!(result.map(|r| r.outcome), Some(ToggleOutcome::Created));
        }

        let summary = repo.summary(None, ReactionTarget::Post, post).await.unwrap().unwrap();
        assert_eq!(summary.reactions_count, 40);
        assert_eq!(summary.reaction_counts.get(ReactionType::Like), 40);
    }
}
