//! Follow relationships and feed suggestions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `follower_id` follows `following_id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub follower_id: i64,
    pub following_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A post suggested to a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedPost {
    pub id: i64,
    pub user_id: i64,
    pub post_id: i64,
    pub post_title: String,
    pub post_author_id: i64,
    /// Why the post was suggested, e.g. `followed_author` or `shared_tags`
    pub reason: String,
    pub score: i64,
    #[serde(skip_serializing)]
    pub is_dismissed: bool,
    pub created_at: DateTime<Utc>,
}

/// Scored candidate produced while refreshing suggestions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionCandidate {
    pub post_id: i64,
    pub reason: String,
    pub score: i64,
}
