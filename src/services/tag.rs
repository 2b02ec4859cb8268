//! Tag service
//!
//! Tags belong to a user and may only be attached to content that user
//! authored. Content services also set tags by name on create/update through
//! [`TagService::set_content_tags`].

use crate::db::repositories::target::is_unique_violation;
use crate::db::repositories::{ContentRepository, TagRepository};
use crate::models::{
    is_valid_color, normalize_tag_name, CreateTagInput, Tag, TagWithCount, TaggedContent,
    UpdateTagInput, User, MAX_TAG_NAME_LEN,
};
use crate::services::error::{ServiceError, ServiceResult};
use anyhow::Context;
use std::sync::Arc;

/// Maximum number of tags on one piece of content
pub const MAX_TAGS_PER_CONTENT: usize = 10;

pub struct TagService {
    tag_repo: Arc<dyn TagRepository>,
    content_repo: Arc<dyn ContentRepository>,
}

impl TagService {
    pub fn new(tag_repo: Arc<dyn TagRepository>, content_repo: Arc<dyn ContentRepository>) -> Self {
        Self {
            tag_repo,
            content_repo,
        }
    }

    pub async fn create(&self, user: &User, input: CreateTagInput) -> ServiceResult<Tag> {
        let name = validate_name(&input.name)?;
        let color = validate_color(input.color)?;

        if self
            .tag_repo
            .get_by_owner_and_name(user.id, &name)
            .await
            .context("Failed to check tag name")?
            .is_some()
        {
            return Err(name_taken(&name));
        }

        match self.tag_repo.create(&Tag::new(user.id, name.clone(), color)).await {
            Ok(tag) => Ok(tag),
            Err(e) if is_unique_violation(&e) => Err(name_taken(&name)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_mine(&self, user: &User) -> ServiceResult<Vec<TagWithCount>> {
        Ok(self
            .tag_repo
            .list_by_owner(user.id)
            .await
            .context("Failed to list tags")?)
    }

    pub async fn update(&self, user: &User, id: i64, input: UpdateTagInput) -> ServiceResult<Tag> {
        let tag = self.owned_tag(user, id).await?;

        let name = match input.name {
            Some(raw) => validate_name(&raw)?,
            None => tag.name.clone(),
        };
        if name != tag.name {
            if let Some(other) = self
                .tag_repo
                .get_by_owner_and_name(user.id, &name)
                .await
                .context("Failed to check tag name")?
            {
                if other.id != tag.id {
                    return Err(name_taken(&name));
                }
            }
        }
        let color = match input.color {
            Some(raw) => validate_color(Some(raw))?,
            None => tag.color.clone(),
        };

        match self.tag_repo.update(id, &name, color.as_deref()).await {
            Ok(()) => Ok(Tag { name, color, ..tag }),
            Err(e) if is_unique_violation(&e) => Err(name_taken(&name)),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a tag and detach it from all content
    pub async fn delete(&self, user: &User, id: i64) -> ServiceResult<()> {
        self.owned_tag(user, id).await?;
        self.tag_repo.delete(id).await.context("Failed to delete tag")?;
        Ok(())
    }

    pub async fn attach(&self, user: &User, tag_id: i64, content: TaggedContent) -> ServiceResult<()> {
        let tag = self.owned_tag(user, tag_id).await?;

        let author = self
            .content_repo
            .author_of(content.content_type, content.content_id)
            .await
            .context("Failed to load content")?
            .ok_or_else(|| ServiceError::NotFound(format!("{} not found", content.content_type)))?;
        if author != tag.owner_id {
            return Err(ServiceError::forbidden(
                "Tags can only be attached to your own content",
            ));
        }

        self.tag_repo
            .attach(tag_id, content)
            .await
            .context("Failed to attach tag")?;
        Ok(())
    }

    pub async fn detach(&self, user: &User, tag_id: i64, content: TaggedContent) -> ServiceResult<()> {
        self.owned_tag(user, tag_id).await?;
        let removed = self
            .tag_repo
            .detach(tag_id, content)
            .await
            .context("Failed to detach tag")?;
        if !removed {
            return Err(ServiceError::NotFound(
                "Tag is not attached to that content".to_string(),
            ));
        }
        Ok(())
    }

    /// Non-deleted content carrying the tag
    pub async fn list_content(&self, tag_id: i64) -> ServiceResult<Vec<TaggedContent>> {
        self.tag_repo
            .get_by_id(tag_id)
            .await
            .context("Failed to load tag")?
            .ok_or_else(|| ServiceError::not_found("Tag"))?;
        Ok(self
            .tag_repo
            .list_content(tag_id)
            .await
            .context("Failed to list tagged content")?)
    }

    /// Replace the author's tags on a piece of content by name
    pub async fn set_content_tags(
        &self,
        author_id: i64,
        content: TaggedContent,
        raw_names: &[String],
    ) -> ServiceResult<()> {
        let names = normalize_tag_list(raw_names)?;
        self.tag_repo
            .set_content_tags(author_id, content, &names)
            .await
            .context("Failed to set content tags")?;
        Ok(())
    }

    async fn owned_tag(&self, user: &User, id: i64) -> ServiceResult<Tag> {
        let tag = self
            .tag_repo
            .get_by_id(id)
            .await
            .context("Failed to load tag")?
            .ok_or_else(|| ServiceError::not_found("Tag"))?;
        if tag.owner_id != user.id {
            return Err(ServiceError::forbidden("You can only manage your own tags"));
        }
        Ok(tag)
    }
}

/// Normalize, dedupe and bound a list of tag names
pub fn normalize_tag_list(raw: &[String]) -> ServiceResult<Vec<String>> {
    let mut names = Vec::with_capacity(raw.len());
    for name in raw {
        let name = validate_name(name)?;
        if !names.contains(&name) {
            names.push(name);
        }
    }
    if names.len() > MAX_TAGS_PER_CONTENT {
        return Err(ServiceError::validation(format!(
            "At most {} tags are allowed",
            MAX_TAGS_PER_CONTENT
        )));
    }
    Ok(names)
}

fn validate_name(raw: &str) -> ServiceResult<String> {
    normalize_tag_name(raw).ok_or_else(|| {
        ServiceError::validation(format!(
            "Tag name must be 1-{} characters",
            MAX_TAG_NAME_LEN
        ))
    })
}

/// Empty clears the color
fn validate_color(color: Option<String>) -> ServiceResult<Option<String>> {
    match color.map(|c| c.trim().to_lowercase()) {
        None => Ok(None),
        Some(c) if c.is_empty() => Ok(None),
        Some(c) if is_valid_color(&c) => Ok(Some(c)),
        Some(_) => Err(ServiceError::validation("Color must look like #rrggbb")),
    }
}

fn name_taken(name: &str) -> ServiceError {
    ServiceError::conflict(format!("You already have a tag named '{}'", name))
}
