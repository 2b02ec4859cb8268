//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{CommentTarget, ReactionTally};

/// Comment entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub author_id: i64,
    #[serde(default)]
    pub author_username: String,
    pub target_type: CommentTarget,
    pub target_id: i64,
    pub parent_id: Option<i64>,
    pub content: String,
    pub reactions_count: i64,
    pub reaction_counts: ReactionTally,
    #[serde(skip_serializing)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a comment
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentInput {
    pub target_type: CommentTarget,
    pub target_id: i64,
    pub parent_id: Option<i64>,
    pub content: String,
}

/// Comment with its replies, for threaded display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub replies: Vec<CommentNode>,
}

/// Deepest reply level kept in a tree. Replies below it are listed flat, in
/// thread order, under their ancestor at the last nested level.
pub const MAX_COMMENT_DEPTH: usize = 8;

/// Build a reply tree from a flat list.
///
/// Input order is kept at every level. Comments whose parent is not in the
/// list are promoted to the top level. The tree is never deeper than
/// [`MAX_COMMENT_DEPTH`].
pub fn build_comment_tree(comments: Vec<Comment>) -> Vec<CommentNode> {
    let ids: std::collections::HashSet<i64> = comments.iter().map(|c| c.id).collect();
    let mut children: HashMap<i64, Vec<Comment>> = HashMap::new();
    let mut roots = Vec::new();

    for comment in comments {
        match comment.parent_id {
            Some(parent) if ids.contains(&parent) => {
                children.entry(parent).or_default().push(comment)
            }
            _ => roots.push(comment),
        }
    }

    roots
        .into_iter()
        .map(|root| attach(root, &mut children, 1))
        .collect()
}

fn attach(comment: Comment, children: &mut HashMap<i64, Vec<Comment>>, level: usize) -> CommentNode {
    let replies = if level + 1 >= MAX_COMMENT_DEPTH {
        flatten_descendants(comment.id, children)
    } else {
        children
            .remove(&comment.id)
            .unwrap_or_default()
            .into_iter()
            .map(|child| attach(child, children, level + 1))
            .collect()
    };
    CommentNode { comment, replies }
}

/// Every descendant of `id` as a leaf, depth-first with sibling order kept
fn flatten_descendants(id: i64, children: &mut HashMap<i64, Vec<Comment>>) -> Vec<CommentNode> {
    let mut flat = Vec::new();
    let mut stack: Vec<Comment> = children.remove(&id).unwrap_or_default();
    stack.reverse();
    while let Some(comment) = stack.pop() {
        if let Some(mut replies) = children.remove(&comment.id) {
            replies.reverse();
            stack.extend(replies);
        }
        flat.push(CommentNode {
            comment,
            replies: Vec::new(),
        });
    }
    flat
}
