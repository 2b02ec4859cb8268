//! Tag model
//!
//! Tags belong to a user. Names are stored trimmed and lower-cased and are
//! unique per owner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ContentType;

/// Maximum tag name length, in characters
pub const MAX_TAG_NAME_LEN: usize = 30;

/// Tag entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    /// Hex color such as `#ff8800`
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Tag {
    pub fn new(owner_id: i64, name: String, color: Option<String>) -> Self {
        Self {
            id: 0,
            owner_id,
            name,
            color,
            created_at: Utc::now(),
        }
    }
}

/// Tag with its usage count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagWithCount {
    #[serde(flatten)]
    pub tag: Tag,
    pub usage_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTagInput {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTagInput {
    pub name: Option<String>,
    pub color: Option<String>,
}

/// Reference to a piece of tagged content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedContent {
    pub content_type: ContentType,
    pub content_id: i64,
}

/// Normalize a tag name: trim and lower-case.
///
/// Returns `None` when the result is empty or longer than
/// [`MAX_TAG_NAME_LEN`].
pub fn normalize_tag_name(raw: &str) -> Option<String> {
    let name = raw.trim().to_lowercase();
    let len = name.chars().count();
    if len == 0 || len > MAX_TAG_NAME_LEN {
        None
    } else {
        Some(name)
    }
}

/// Check a `#rrggbb` color string
pub fn is_valid_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_tag_name() {
        assert_eq!(normalize_tag_name("  Rust "), Some("rust".to_string()));
        assert_eq!(normalize_tag_name("   "), None);
        assert_eq!(normalize_tag_name(&"a".repeat(31)), None);
        assert_eq!(normalize_tag_name(&"a".repeat(30)), Some("a".repeat(30)));
    }

    #[test]
    fn test_is_valid_color() {
        assert!(is_valid_color("#FF8800"));
        assert!(!is_valid_color("FF8800"));
        assert!(!is_valid_color("#ff88zz"));
        assert!(!is_valid_color("#fff"));
    }

    proptest! {
        /// Normalizing is idempotent
        #[test]
        fn normalize_is_idempotent(raw in "\\PC{0,40}") {
            if let Some(once) = normalize_tag_name(&raw) {
                prop_assert_eq!(normalize_tag_name(&once), Some(once.clone()));
            }
        }
    }
}
