//! Collection models
//!
//! A collection is a named, optionally public list of posts, snippets and
//! issues. The owner can share it with collaborators, who either only read
//! it (`viewer`) or may also add and remove items (`editor`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ContentType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    #[serde(default)]
    pub items_count: i64,
    #[serde(skip_serializing)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCollectionInput {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCollectionInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionItem {
    pub id: i64,
    pub collection_id: i64,
    pub item_type: ContentType,
    pub item_id: i64,
    pub added_by: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddItemInput {
    pub item_type: ContentType,
    pub item_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollaboratorRole {
    #[default]
    Viewer,
    Editor,
}

impl fmt::Display for CollaboratorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollaboratorRole::Viewer => write!(f, "viewer"),
            CollaboratorRole::Editor => write!(f, "editor"),
        }
    }
}

impl FromStr for CollaboratorRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "viewer" => Ok(CollaboratorRole::Viewer),
            "editor" => Ok(CollaboratorRole::Editor),
            _ => Err(anyhow::anyhow!("Invalid collaborator role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collaborator {
    pub id: i64,
    pub collection_id: i64,
    pub user_id: i64,
    pub username: String,
    pub role: CollaboratorRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddCollaboratorInput {
    pub username: String,
    #[serde(default)]
    pub role: CollaboratorRole,
}

/// What a given user may do with a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionAccess {
    Owner,
    Collaborator(CollaboratorRole),
    /// Not a member, but the collection is public
    Public,
    None,
}

impl CollectionAccess {
    pub fn can_read(&self) -> bool {
        !matches!(self, CollectionAccess::None)
    }

    pub fn can_edit_items(&self) -> bool {
        matches!(
            self,
            CollectionAccess::Owner | CollectionAccess::Collaborator(CollaboratorRole::Editor)
        )
    }

    pub fn is_owner(&self) -> bool {
        matches!(self, CollectionAccess::Owner)
    }
}
