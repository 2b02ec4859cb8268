//! Issue and solution models
//!
//! An issue is a question, optionally with code. Other users answer it with
//! solutions; the issue author may accept exactly one of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueStatus {
    #[default]
    Open,
    /// A solution has been accepted
    Resolved,
    /// Closed by the author; no new solutions
    Closed,
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueStatus::Open => write!(f, "open"),
            IssueStatus::Resolved => write!(f, "resolved"),
            IssueStatus::Closed => write!(f, "closed"),
        }
    }
}

impl FromStr for IssueStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(IssueStatus::Open),
            "resolved" => Ok(IssueStatus::Resolved),
            "closed" => Ok(IssueStatus::Closed),
            _ => Err(anyhow::anyhow!("Invalid issue status: {}", s)),
        }
    }
}

/// Issue entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: i64,
    pub author_id: i64,
    #[serde(default)]
    pub author_username: String,
    pub title: String,
    pub description: String,
    pub code: Option<String>,
    pub language: Option<String>,
    pub status: IssueStatus,
    pub accepted_solution_id: Option<i64>,
    pub likes_count: i64,
    pub dislikes_count: i64,
    pub solutions_count: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateIssueInput {
    pub title: String,
    pub description: String,
    pub code: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateIssueInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub code: Option<String>,
    pub language: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    pub status: Option<IssueStatus>,
    pub author_id: Option<i64>,
    pub tag: Option<String>,
}

/// Answer to an issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    pub id: i64,
    pub issue_id: i64,
    pub author_id: i64,
    #[serde(default)]
    pub author_username: String,
    pub content: String,
    pub code: Option<String>,
    pub is_accepted: bool,
    pub likes_count: i64,
    pub dislikes_count: i64,
    #[serde(skip_serializing)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSolutionInput {
    pub content: String,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSolutionInput {
    pub content: Option<String>,
    pub code: Option<String>,
}
