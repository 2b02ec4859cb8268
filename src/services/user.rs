//! User service
//!
//! Public profiles, self-service profile edits and the admin user
//! management operations.

use crate::db::repositories::{SubscriptionRepository, UserRepository};
use crate::models::{ListParams, PagedResult, PublicProfile, UpdateProfileInput, User, UserRole};
use crate::services::error::{require_text, ServiceError, ServiceResult};
use anyhow::Context;
use std::sync::Arc;

const MAX_DISPLAY_NAME_LEN: usize = 50;
const MAX_BIO_LEN: usize = 500;
const MAX_AVATAR_URL_LEN: usize = 500;

pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    subscription_repo: Arc<dyn SubscriptionRepository>,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        subscription_repo: Arc<dyn SubscriptionRepository>,
    ) -> Self {
        Self {
            user_repo,
            subscription_repo,
        }
    }

    /// Resolve a username to a live (non-deleted) user
    pub async fn find_by_username(&self, username: &str) -> ServiceResult<User> {
        self.user_repo
            .get_by_username(username)
            .await
            .context("Failed to look up user")?
            .filter(|u| !u.is_deleted)
            .ok_or_else(|| ServiceError::not_found("User"))
    }

    pub async fn get_profile(&self, username: &str) -> ServiceResult<PublicProfile> {
        let user = self.find_by_username(username).await?;
        let (followers, following) = self
            .subscription_repo
            .counts(user.id)
            .await
            .context("Failed to count subscriptions")?;
        Ok(PublicProfile::from_user(user, followers, following))
    }

    /// Update the caller's own profile. Empty strings clear a field.
    pub async fn update_profile(&self, user: &User, input: UpdateProfileInput) -> ServiceResult<User> {
        let mut updated = user.clone();

        if let Some(display_name) = input.display_name {
            updated.display_name = optional_field("Display name", &display_name, MAX_DISPLAY_NAME_LEN)?;
        }
        if let Some(bio) = input.bio {
            updated.bio = optional_field("Bio", &bio, MAX_BIO_LEN)?;
        }
        if let Some(avatar_url) = input.avatar_url {
            let avatar_url = optional_field("Avatar URL", &avatar_url, MAX_AVATAR_URL_LEN)?;
            if let Some(url) = avatar_url.as_deref() {
                if !(url.starts_with("https://") || url.starts_with("http://")) {
                    return Err(ServiceError::validation("Avatar URL must be an http(s) URL"));
                }
            }
            updated.avatar_url = avatar_url;
        }

        let saved = self
            .user_repo
            .update(&updated)
            .await
            .context("Failed to update profile")?;
        Ok(saved)
    }

    pub async fn list_users(
        &self,
        search: Option<&str>,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<User>> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        Ok(self
            .user_repo
            .list(search, params)
            .await
            .context("Failed to list users")?)
    }

    pub async fn set_role(&self, admin: &User, user_id: i64, role: UserRole) -> ServiceResult<User> {
        if admin.id == user_id && role != UserRole::Admin {
            return Err(ServiceError::validation("You cannot remove your own admin role"));
        }
        let mut user = self.get_any(user_id).await?;
        user.role = role;
        let user = self
            .user_repo
            .update(&user)
            .await
            .context("Failed to update role")?;
        tracing::info!(user_id, role = %role, by = admin.id, "User role changed");
        Ok(user)
    }

    /// Soft-delete or restore an account
    pub async fn set_deleted(&self, admin: &User, user_id: i64, deleted: bool) -> ServiceResult<User> {
        if admin.id == user_id && deleted {
            return Err(ServiceError::validation("You cannot delete your own account"));
        }
        let mut user = self.get_any(user_id).await?;
        self.user_repo
            .set_deleted(user_id, deleted)
            .await
            .context("Failed to update user")?;
        user.is_deleted = deleted;
        tracing::info!(user_id, deleted, by = admin.id, "User deletion state changed");
        Ok(user)
    }

    async fn get_any(&self, user_id: i64) -> ServiceResult<User> {
        self.user_repo
            .get_by_id(user_id)
            .await
            .context("Failed to load user")?
            .ok_or_else(|| ServiceError::not_found("User"))
    }
}

fn optional_field(field: &str, value: &str, max_chars: usize) -> ServiceResult<Option<String>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    require_text(field, value, max_chars)?;
    Ok(Some(value.to_string()))
}
