//! Collection service
//!
//! Access rules:
//! - the owner can do everything
//! - `editor` collaborators can add and remove items
//! - `viewer` collaborators, and anyone when the collection is public, can read
//!
//! Private collections are reported as missing to users who cannot read them.

use crate::db::repositories::{CollectionRepository, ContentRepository, UserRepository};
use crate::models::{
    AddCollaboratorInput, AddItemInput, Collaborator, Collection, CollectionAccess,
    CollectionItem, ContentType, CreateCollectionInput, ListParams, PagedResult,
    UpdateCollectionInput, User,
};
use crate::services::error::{require_text, ServiceError, ServiceResult};
use anyhow::Context;
use std::sync::Arc;

const MAX_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 1_000;

pub struct CollectionService {
    repo: Arc<dyn CollectionRepository>,
    user_repo: Arc<dyn UserRepository>,
    content_repo: Arc<dyn ContentRepository>,
}

impl CollectionService {
    pub fn new(
        repo: Arc<dyn CollectionRepository>,
        user_repo: Arc<dyn UserRepository>,
        content_repo: Arc<dyn ContentRepository>,
    ) -> Self {
        Self {
            repo,
            user_repo,
            content_repo,
        }
    }

    pub async fn create(
        &self,
        owner: &User,
        input: CreateCollectionInput,
    ) -> ServiceResult<Collection> {
        let name = input.name.trim();
        require_text("Name", name, MAX_NAME_LEN)?;
        let description = clean_description(input.description.as_deref())?;
        self.ensure_name_free(owner.id, name, None).await?;

        let collection = self
            .repo
            .create(owner.id, name, description.as_deref(), input.is_public)
            .await
            .context("Failed to create collection")?;
        tracing::debug!(collection_id = collection.id, owner_id = owner.id, "Collection created");
        Ok(collection)
    }

    pub async fn get(&self, viewer: Option<&User>, id: i64) -> ServiceResult<Collection> {
        let (collection, access) = self.load_with_access(viewer, id).await?;
        if !access.can_read() {
            return Err(ServiceError::not_found("Collection"));
        }
        Ok(collection)
    }

    pub async fn update(
        &self,
        user: &User,
        id: i64,
        input: UpdateCollectionInput,
    ) -> ServiceResult<Collection> {
        let collection = self.require_owner(user, id).await?;

        let name = input
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or(&collection.name)
            .to_string();
        require_text("Name", &name, MAX_NAME_LEN)?;
        if name != collection.name {
            self.ensure_name_free(user.id, &name, Some(id)).await?;
        }
        let description = match input.description.as_deref() {
            Some(raw) => clean_description(Some(raw))?,
            None => collection.description.clone(),
        };
        let is_public = input.is_public.unwrap_or(collection.is_public);

        self.repo
            .update(id, &name, description.as_deref(), is_public)
            .await
            .context("Failed to update collection")?;
        self.get(Some(user), id).await
    }

    pub async fn delete(&self, user: &User, id: i64) -> ServiceResult<()> {
        self.require_owner(user, id).await?;
        self.repo
            .soft_delete(id)
            .await
            .context("Failed to delete collection")?;
        tracing::info!(collection_id = id, "Collection deleted");
        Ok(())
    }

    /// Collections the user owns or collaborates on
    pub async fn list_for_user(
        &self,
        user: &User,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<Collection>> {
        Ok(self
            .repo
            .list_for_user(user.id, params)
            .await
            .context("Failed to list collections")?)
    }

    pub async fn items(&self, viewer: Option<&User>, id: i64) -> ServiceResult<Vec<CollectionItem>> {
        self.get(viewer, id).await?;
        Ok(self
            .repo
            .list_items(id)
            .await
            .context("Failed to list collection items")?)
    }

    pub async fn add_item(
        &self,
        user: &User,
        id: i64,
        input: AddItemInput,
    ) -> ServiceResult<Vec<CollectionItem>> {
        self.require_item_editor(user, id).await?;

        self.content_repo
            .author_of(input.item_type, input.item_id)
            .await
            .context("Failed to look up item")?
            .ok_or_else(|| ServiceError::not_found(content_label(input.item_type)))?;

        let added = self
            .repo
            .add_item(id, input.item_type, input.item_id, user.id)
            .await
            .context("Failed to add collection item")?;
        if !added {
            return Err(ServiceError::conflict("Item is already in this collection"));
        }
        self.items(Some(user), id).await
    }

    pub async fn remove_item(
        &self,
        user: &User,
        id: i64,
        item_type: ContentType,
        item_id: i64,
    ) -> ServiceResult<()> {
        self.require_item_editor(user, id).await?;
        let removed = self
            .repo
            .remove_item(id, item_type, item_id)
            .await
            .context("Failed to remove collection item")?;
        if !removed {
            return Err(ServiceError::not_found("Collection item"));
        }
        Ok(())
    }

    pub async fn collaborators(
        &self,
        viewer: Option<&User>,
        id: i64,
    ) -> ServiceResult<Vec<Collaborator>> {
        self.get(viewer, id).await?;
        Ok(self
            .repo
            .list_collaborators(id)
            .await
            .context("Failed to list collaborators")?)
    }

    /// Add a collaborator by username, or change their role if already added
    pub async fn add_collaborator(
        &self,
        owner: &User,
        id: i64,
        input: AddCollaboratorInput,
    ) -> ServiceResult<Collaborator> {
        self.require_owner(owner, id).await?;
        let target = self.live_user(input.username.trim()).await?;
        if target.id == owner.id {
            return Err(ServiceError::validation(
                "You cannot add yourself as a collaborator",
            ));
        }

        self.repo
            .upsert_collaborator(id, target.id, input.role)
            .await
            .context("Failed to save collaborator")?;
        tracing::debug!(collection_id = id, user_id = target.id, role = %input.role, "Collaborator saved");

        self.repo
            .get_collaborator(id, target.id)
            .await
            .context("Failed to load collaborator")?
            .ok_or_else(|| ServiceError::not_found("Collaborator"))
    }

    pub async fn remove_collaborator(&self, owner: &User, id: i64, username: &str) -> ServiceResult<()> {
        self.require_owner(owner, id).await?;
        let target = self.live_user(username).await?;
        let removed = self
            .repo
            .remove_collaborator(id, target.id)
            .await
            .context("Failed to remove collaborator")?;
        if !removed {
            return Err(ServiceError::not_found("Collaborator"));
        }
        Ok(())
    }

    async fn load_with_access(
        &self,
        viewer: Option<&User>,
        id: i64,
    ) -> ServiceResult<(Collection, CollectionAccess)> {
        let collection = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to load collection")?
            .ok_or_else(|| ServiceError::not_found("Collection"))?;

        let access = match viewer {
            Some(user) if user.id == collection.owner_id => CollectionAccess::Owner,
            Some(user) => match self
                .repo
                .get_collaborator(id, user.id)
                .await
                .context("Failed to load collaborator")?
            {
                Some(c) => CollectionAccess::Collaborator(c.role),
                None if collection.is_public => CollectionAccess::Public,
                None => CollectionAccess::None,
            },
            None if collection.is_public => CollectionAccess::Public,
            None => CollectionAccess::None,
        };
        Ok((collection, access))
    }

    async fn require_owner(&self, user: &User, id: i64) -> ServiceResult<Collection> {
        let (collection, access) = self.load_with_access(Some(user), id).await?;
        if access.is_owner() {
            Ok(collection)
        } else if access.can_read() {
            Err(ServiceError::forbidden("Only the owner can manage this collection"))
        } else {
            Err(ServiceError::not_found("Collection"))
        }
    }

    async fn require_item_editor(&self, user: &User, id: i64) -> ServiceResult<Collection> {
        let (collection, access) = self.load_with_access(Some(user), id).await?;
        if access.can_edit_items() {
            Ok(collection)
        } else if access.can_read() {
            Err(ServiceError::forbidden("You cannot change items in this collection"))
        } else {
            Err(ServiceError::not_found("Collection"))
        }
    }

    async fn ensure_name_free(&self, owner_id: i64, name: &str, except: Option<i64>) -> ServiceResult<()> {
        let taken = self
            .repo
            .name_taken(owner_id, name, except)
            .await
            .context("Failed to check collection name")?;
        if taken {
            return Err(ServiceError::conflict(format!(
                "You already have a collection named '{}'",
                name
            )));
        }
        Ok(())
    }

    async fn live_user(&self, username: &str) -> ServiceResult<User> {
        self.user_repo
            .get_by_username(username)
            .await
            .context("Failed to look up user")?
            .filter(|u| !u.is_deleted)
            .ok_or_else(|| ServiceError::not_found("User"))
    }
}

fn clean_description(raw: Option<&str>) -> ServiceResult<Option<String>> {
    match raw.map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => {
            require_text("Description", d, MAX_DESCRIPTION_LEN)?;
            Ok(Some(d.to_string()))
        }
        None => Ok(None),
    }
}

fn content_label(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Post => "Post",
        ContentType::Snippet => "Snippet",
        ContentType::Issue => "Issue",
    }
}
