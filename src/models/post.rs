//! Post model
//!
//! Long-form articles written by users. Posts carry denormalized view,
//! comment and reaction counters that are kept in sync by the services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ReactionTally;

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier
    pub id: i64,
    /// Author user ID
    pub author_id: i64,
    /// Author username, filled from a join
    #[serde(default)]
    pub author_username: String,
    pub title: String,
    pub content: String,
    pub views_count: i64,
    pub comments_count: i64,
    /// Total number of reactions of any type
    pub reactions_count: i64,
    /// Reactions broken down by type
    pub reaction_counts: ReactionTally,
    /// Names of the author's tags attached to this post
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new post
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostInput {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Input for updating a post. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePostInput {
    pub title: Option<String>,
    pub content: Option<String>,
    /// Replaces the full tag set when present
    pub tags: Option<Vec<String>>,
}

/// List filters for posts
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub author_id: Option<i64>,
    pub tag: Option<String>,
}
