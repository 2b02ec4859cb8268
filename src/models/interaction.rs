//! Interaction (emoji reaction) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::{ReactionTarget, ToggleOutcome};

/// Supported reactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionType {
    Like,
    Love,
    Laugh,
    Insightful,
    Celebrate,
    Confused,
}

impl ReactionType {
    pub const ALL: [ReactionType; 6] = [
        ReactionType::Like,
        ReactionType::Love,
        ReactionType::Laugh,
        ReactionType::Insightful,
        ReactionType::Celebrate,
        ReactionType::Confused,
    ];
}

impl fmt::Display for ReactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReactionType::Like => "like",
            ReactionType::Love => "love",
            ReactionType::Laugh => "laugh",
            ReactionType::Insightful => "insightful",
            ReactionType::Celebrate => "celebrate",
            ReactionType::Confused => "confused",
        };
        f.write_str(name)
    }
}

impl FromStr for ReactionType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReactionType::ALL
            .into_iter()
            .find(|r| r.to_string() == s.to_lowercase())
            .ok_or_else(|| anyhow::anyhow!("Invalid reaction type: {}", s))
    }
}

/// One user's reaction to one target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: i64,
    pub user_id: i64,
    pub target_type: ReactionTarget,
    pub target_id: i64,
    pub reaction_type: ReactionType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-reaction counters stored as JSON on the target row.
///
/// Zero entries are dropped so the stored map only lists reactions that
/// somebody currently has.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReactionTally(pub BTreeMap<String, i64>);

impl ReactionTally {
    /// Parse the stored column value. Corrupt JSON is treated as empty.
    pub fn from_json(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_default()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn get(&self, reaction: ReactionType) -> i64 {
        self.0.get(&reaction.to_string()).copied().unwrap_or(0)
    }

    pub fn increment(&mut self, reaction: ReactionType) {
        *self.0.entry(reaction.to_string()).or_insert(0) += 1;
    }

    pub fn decrement(&mut self, reaction: ReactionType) {
        let key = reaction.to_string();
        if let Some(count) = self.0.get_mut(&key) {
            *count -= 1;
            if *count <= 0 {
                self.0.remove(&key);
            }
        }
    }

    pub fn total(&self) -> i64 {
        self.0.values().sum()
    }
}

/// Decide the outcome of a reaction request given the caller's current one
pub fn plan_reaction(existing: Option<ReactionType>, requested: ReactionType) -> ToggleOutcome {
    match existing {
        None => ToggleOutcome::Created,
        Some(prev) if prev == requested => ToggleOutcome::Removed,
        Some(_) => ToggleOutcome::Changed,
    }
}

/// Reaction state of a target after a toggle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionResult {
    pub outcome: ToggleOutcome,
    pub reactions_count: i64,
    pub reaction_counts: ReactionTally,
    /// The caller's reaction after the toggle
    pub reaction_type: Option<ReactionType>,
}

/// Reaction summary of a target, optionally with the viewer's own reaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionSummary {
    pub reactions_count: i64,
    pub reaction_counts: ReactionTally,
    pub my_reaction: Option<ReactionType>,
}
