//! Snippet models
//!
//! - `Snippet`: public code snippet, reactable and commentable
//! - `PrivateSnippet` / `PrivateSnippetVersion`: owner-only snippet with an
//!   immutable version history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ReactionTally;

/// Public code snippet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snippet {
    pub id: i64,
    pub author_id: i64,
    #[serde(default)]
    pub author_username: String,
    pub title: String,
    pub description: Option<String>,
    pub code: String,
    pub language: String,
    pub comments_count: i64,
    pub reactions_count: i64,
    pub reaction_counts: ReactionTally,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSnippetInput {
    pub title: String,
    pub description: Option<String>,
    pub code: String,
    pub language: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSnippetInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub code: Option<String>,
    pub language: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// List filters for snippets
#[derive(Debug, Clone, Default)]
pub struct SnippetFilter {
    pub author_id: Option<i64>,
    pub language: Option<String>,
    pub tag: Option<String>,
}

/// Owner-only snippet. `code` is the code of `current_version`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateSnippet {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub language: String,
    pub current_version: i64,
    pub code: String,
    #[serde(skip_serializing)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One immutable revision of a private snippet's code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateSnippetVersion {
    pub id: i64,
    pub snippet_id: i64,
    pub version: i64,
    pub code: String,
    pub change_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePrivateSnippetInput {
    pub title: String,
    pub language: String,
    pub code: String,
}

/// Changing `code` records a new version; title and language do not
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePrivateSnippetInput {
    pub title: Option<String>,
    pub language: Option<String>,
    pub code: Option<String>,
    pub change_note: Option<String>,
}
