//! Comment service

use crate::db::repositories::{CommentInsert, CommentRepository};
use crate::models::{build_comment_tree, Comment, CommentNode, CommentTarget, CreateCommentInput, User};
use crate::services::error::{require_text, ServiceError, ServiceResult};
use crate::services::score::ScoreService;
use anyhow::Context;
use std::sync::Arc;

pub const MAX_COMMENT_LEN: usize = 10_000;

pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    score: Arc<ScoreService>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn CommentRepository>, score: Arc<ScoreService>) -> Self {
        Self { repo, score }
    }

    /// Create a comment or a reply.
    ///
    /// The target must exist; a reply's parent must be a live comment on the
    /// same target.
    pub async fn create(&self, author: &User, input: CreateCommentInput) -> ServiceResult<Comment> {
        let content = input.content.trim();
        require_text("Content", content, MAX_COMMENT_LEN)?;

        let insert = self
            .repo
            .create(
                author.id,
                input.target_type,
                input.target_id,
                input.parent_id,
                content,
            )
            .await
            .context("Failed to create comment")?;

        match insert {
            CommentInsert::Created(comment) => {
                self.score.schedule(author.id);
                Ok(comment)
            }
            CommentInsert::TargetNotFound => Err(ServiceError::not_found(target_label(input.target_type))),
            CommentInsert::ParentNotFound => Err(ServiceError::not_found("Parent comment")),
            CommentInsert::ParentMismatch => Err(ServiceError::validation(
                "Parent comment belongs to a different target",
            )),
        }
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Comment> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to load comment")?
            .ok_or_else(|| ServiceError::not_found("Comment"))
    }

    pub async fn update(&self, user: &User, id: i64, content: &str) -> ServiceResult<Comment> {
        let comment = self.get(id).await?;
        if comment.author_id != user.id {
            return Err(ServiceError::forbidden("Only the author can edit this comment"));
        }
        let content = content.trim();
        require_text("Content", content, MAX_COMMENT_LEN)?;

        self.repo
            .update(id, content)
            .await
            .context("Failed to update comment")?;
        self.get(id).await
    }

    pub async fn delete(&self, user: &User, id: i64) -> ServiceResult<()> {
        let comment = self.get(id).await?;
        if !user.can_modify(comment.author_id) {
            return Err(ServiceError::forbidden("Only the author can delete this comment"));
        }
        self.repo
            .soft_delete(id)
            .await
            .context("Failed to delete comment")?;
        self.score.schedule(comment.author_id);
        tracing::info!(comment_id = id, by = user.id, "Comment deleted");
        Ok(())
    }

    /// Threaded comments on a target, oldest first at every level
    pub async fn list_tree(
        &self,
        target: CommentTarget,
        target_id: i64,
    ) -> ServiceResult<Vec<CommentNode>> {
        let comments = self
            .repo
            .list_by_target(target, target_id)
            .await
            .context("Failed to list comments")?;
        Ok(build_comment_tree(comments))
    }
}

fn target_label(target: CommentTarget) -> &'static str {
    match target {
        CommentTarget::Post => "Post",
        CommentTarget::Snippet => "Snippet",
        CommentTarget::Issue => "Issue",
        CommentTarget::Solution => "Solution",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        PostRepository, SqlxCommentRepository, SqlxPostRepository, SqlxScoreRepository,
        SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations, DbPool};
    use crate::models::UserRole;

    async fn setup_test_service() -> (DbPool, CommentService, Arc<ScoreService>) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let score = Arc::new(ScoreService::new(
            SqlxScoreRepository::boxed(pool.clone()),
            SqlxUserRepository::boxed(pool.clone()),
        ));
        let service = CommentService::new(SqlxCommentRepository::boxed(pool.clone()), score.clone());
        (pool, service, score)
    }

    async fn create_user(pool: &DbPool, name: &str, role: UserRole) -> User {
        SqlxUserRepository::new(pool.clone())
            .create(&User::new(
                name.to_string(),
                format!("{}@example.com", name),
                None,
                role,
            ))
            .await
            .unwrap()
    }

    async fn create_post(pool: &DbPool, author: &User) -> i64 {
        SqlxPostRepository::new(pool.clone())
            .create(author.id, "Hello", "Body")
            .await
            .unwrap()
            .id
    }

    fn on_post(post_id: i64, parent_id: Option<i64>, content: &str) -> CreateCommentInput {
        CreateCommentInput {
            target_type: CommentTarget::Post,
            target_id: post_id,
            parent_id,
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_thread_and_score() {
        let (pool, service, score) = setup_test_service().await;
        let alice = create_user(&pool, "alice", UserRole::User).await;
        let post_id = create_post(&pool, &alice).await;

        let root = service.create(&alice, on_post(post_id, None, "First")).await.unwrap();
        let reply = service
            .create(&alice, on_post(post_id, Some(root.id), "  Reply  "))
            .await
            .unwrap();
        assert_eq!(reply.content, "Reply");
        service.create(&alice, on_post(post_id, None, "Second")).await.unwrap();

        let tree = service.list_tree(CommentTarget::Post, post_id).await.unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].comment.id, root.id);
        assert_eq!(tree[0].replies[0].comment.id, reply.id);
        assert_eq!(score.recalculate(alice.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_create_errors() {
        let (pool, service, _) = setup_test_service().await;
        let alice = create_user(&pool, "alice", UserRole::User).await;
        let post_id = create_post(&pool, &alice).await;
        let other_post = create_post(&pool, &alice).await;

        assert!(matches!(
            service.create(&alice, on_post(999, None, "Hi")).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.create(&alice, on_post(post_id, Some(999), "Hi")).await,
            Err(ServiceError::NotFound(_))
        ));
        let root = service.create(&alice, on_post(post_id, None, "Hi")).await.unwrap();
        assert!(matches!(
            service.create(&alice, on_post(other_post, Some(root.id), "Hi")).await,
            Err(ServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.create(&alice, on_post(post_id, None, "   ")).await,
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_edit_and_delete_permissions() {
        let (pool, service, _) = setup_test_service().await;
        let admin = create_user(&pool, "admin", UserRole::Admin).await;
        let alice = create_user(&pool, "alice", UserRole::User).await;
        let bob = create_user(&pool, "bob", UserRole::User).await;
        let post_id = create_post(&pool, &alice).await;
        let comment = service.create(&bob, on_post(post_id, None, "Hi")).await.unwrap();

        assert!(matches!(
            service.update(&admin, comment.id, "Edited").await,
            Err(ServiceError::Forbidden(_))
        ));
        assert_eq!(service.update(&bob, comment.id, "Edited").await.unwrap().content, "Edited");

        assert!(matches!(
            service.delete(&alice, comment.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        service.delete(&admin, comment.id).await.unwrap();
        assert!(service.list_tree(CommentTarget::Post, post_id).await.unwrap().is_empty());

        let count: i64 = sqlx::query_scalar("SELECT comments_count FROM posts WHERE id = ?")
            .bind(post_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
