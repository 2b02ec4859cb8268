//! Polymorphic target types
//!
//! Votes, reactions, comments, tags and collection items all point at "some
//! content row". Each kind of reference has its own closed set of allowed
//! tables, modelled as a separate enum so that, for example, a vote can never
//! be aimed at a post.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Content that can be tagged, collected or suggested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Post,
    Snippet,
    Issue,
}

impl ContentType {
    pub fn table(&self) -> &'static str {
        match self {
            ContentType::Post => "posts",
            ContentType::Snippet => "snippets",
            ContentType::Issue => "issues",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Post => write!(f, "post"),
            ContentType::Snippet => write!(f, "snippet"),
            ContentType::Issue => write!(f, "issue"),
        }
    }
}

impl FromStr for ContentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "post" => Ok(ContentType::Post),
            "snippet" => Ok(ContentType::Snippet),
            "issue" => Ok(ContentType::Issue),
            _ => Err(anyhow::anyhow!("Invalid content type: {}", s)),
        }
    }
}

/// Anything that can be commented on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentTarget {
    Post,
    Snippet,
    Issue,
    Solution,
}

impl CommentTarget {
    pub fn table(&self) -> &'static str {
        match self {
            CommentTarget::Post => "posts",
            CommentTarget::Snippet => "snippets",
            CommentTarget::Issue => "issues",
            CommentTarget::Solution => "solutions",
        }
    }

    /// Whether the target row carries a denormalized `comments_count`
    pub fn has_comment_counter(&self) -> bool {
        matches!(self, CommentTarget::Post | CommentTarget::Snippet)
    }
}

impl fmt::Display for CommentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommentTarget::Post => write!(f, "post"),
            CommentTarget::Snippet => write!(f, "snippet"),
            CommentTarget::Issue => write!(f, "issue"),
            CommentTarget::Solution => write!(f, "solution"),
        }
    }
}

impl FromStr for CommentTarget {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "post" => Ok(CommentTarget::Post),
            "snippet" => Ok(CommentTarget::Snippet),
            "issue" => Ok(CommentTarget::Issue),
            "solution" => Ok(CommentTarget::Solution),
            _ => Err(anyhow::anyhow!("Invalid comment target: {}", s)),
        }
    }
}

/// Anything that can receive emoji reactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionTarget {
    Post,
    Snippet,
    Comment,
}

impl ReactionTarget {
    pub fn table(&self) -> &'static str {
        match self {
            ReactionTarget::Post => "posts",
            ReactionTarget::Snippet => "snippets",
            ReactionTarget::Comment => "comments",
        }
    }
}

impl fmt::Display for ReactionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReactionTarget::Post => write!(f, "post"),
            ReactionTarget::Snippet => write!(f, "snippet"),
            ReactionTarget::Comment => write!(f, "comment"),
        }
    }
}

impl FromStr for ReactionTarget {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "post" => Ok(ReactionTarget::Post),
            "snippet" => Ok(ReactionTarget::Snippet),
            "comment" => Ok(ReactionTarget::Comment),
            _ => Err(anyhow::anyhow!("Invalid reaction target: {}", s)),
        }
    }
}

/// Anything that can be liked or disliked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteTarget {
    Issue,
    Solution,
}

impl VoteTarget {
    pub fn table(&self) -> &'static str {
        match self {
            VoteTarget::Issue => "issues",
            VoteTarget::Solution => "solutions",
        }
    }
}

impl fmt::Display for VoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteTarget::Issue => write!(f, "issue"),
            VoteTarget::Solution => write!(f, "solution"),
        }
    }
}

impl FromStr for VoteTarget {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "issue" => Ok(VoteTarget::Issue),
            "solution" => Ok(VoteTarget::Solution),
            _ => Err(anyhow::anyhow!("Invalid vote target: {}", s)),
        }
    }
}
