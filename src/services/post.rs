//! Post service
//!
//! Articles with optional tags. Only the author or an admin may modify a
//! post; deletion is soft.

use crate::db::repositories::PostRepository;
use crate::models::{
    normalize_tag_name, ContentType, CreatePostInput, ListParams, PagedResult, Post, PostFilter,
    TaggedContent, UpdatePostInput, User,
};
use crate::services::error::{require_text, ServiceError, ServiceResult};
use crate::services::tag::TagService;
use anyhow::Context;
use std::sync::Arc;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_CONTENT_LEN: usize = 100_000;

pub struct PostService {
    post_repo: Arc<dyn PostRepository>,
    tags: Arc<TagService>,
}

impl PostService {
    pub fn new(post_repo: Arc<dyn PostRepository>, tags: Arc<TagService>) -> Self {
        Self { post_repo, tags }
    }

    pub async fn create(&self, author: &User, input: CreatePostInput) -> ServiceResult<Post> {
        let title = input.title.trim();
        require_text("Title", title, MAX_TITLE_LEN)?;
        require_text("Content", &input.content, MAX_CONTENT_LEN)?;

        let post = self
            .post_repo
            .create(author.id, title, &input.content)
            .await
            .context("Failed to create post")?;

        if let Some(tags) = input.tags.filter(|t| !t.is_empty()) {
            self.tags
                .set_content_tags(author.id, content_ref(post.id), &tags)
                .await?;
            return self.load(post.id).await;
        }

        tracing::debug!(post_id = post.id, author_id = author.id, "Post created");
        Ok(post)
    }

    /// Fetch a post and count the view
    pub async fn view(&self, id: i64) -> ServiceResult<Post> {
        self.load(id).await?;
        self.post_repo
            .increment_views(id)
            .await
            .context("Failed to count view")?;
        self.load(id).await
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Post> {
        self.load(id).await
    }

    pub async fn update(&self, user: &User, id: i64, input: UpdatePostInput) -> ServiceResult<Post> {
        let post = self.load(id).await?;
        if !user.can_modify(post.author_id) {
            return Err(ServiceError::forbidden("Only the author can edit this post"));
        }

        let title = input.title.as_deref().map(str::trim).unwrap_or(&post.title);
        let content = input.content.as_deref().unwrap_or(&post.content);
        require_text("Title", title, MAX_TITLE_LEN)?;
        require_text("Content", content, MAX_CONTENT_LEN)?;

        self.post_repo
            .update(id, title, content)
            .await
            .context("Failed to update post")?;

        if let Some(tags) = input.tags {
            self.tags
                .set_content_tags(post.author_id, content_ref(id), &tags)
                .await?;
        }

        self.load(id).await
    }

    pub async fn delete(&self, user: &User, id: i64) -> ServiceResult<()> {
        let post = self.load(id).await?;
        if !user.can_modify(post.author_id) {
            return Err(ServiceError::forbidden("Only the author can delete this post"));
        }
        self.post_repo
            .soft_delete(id)
            .await
            .context("Failed to delete post")?;
        tracing::info!(post_id = id, by = user.id, "Post deleted");
        Ok(())
    }

    pub async fn list(
        &self,
        mut filter: PostFilter,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<Post>> {
        filter.tag = filter.tag.as_deref().and_then(normalize_tag_name);
        Ok(self
            .post_repo
            .list(&filter, params)
            .await
            .context("Failed to list posts")?)
    }

    async fn load(&self, id: i64) -> ServiceResult<Post> {
        self.post_repo
            .get_by_id(id)
            .await
            .context("Failed to load post")?
            .ok_or_else(|| ServiceError::not_found("Post"))
    }
}

fn content_ref(id: i64) -> TaggedContent {
    TaggedContent {
        content_type: ContentType::Post,
        content_id: id,
    }
}
