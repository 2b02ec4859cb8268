//! Vote model
//!
//! A vote is a like or dislike by one user on an issue or a solution. At most
//! one vote exists per (user, target type, target id).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::VoteTarget;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: i64,
    pub user_id: i64,
    pub target_type: VoteTarget,
    pub target_id: i64,
    pub is_dislike: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a toggle request did to the caller's vote or reaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleOutcome {
    /// No prior record; one was inserted
    Created,
    /// Same polarity/type as before; the record was deleted
    Removed,
    /// Different polarity/type; the record was updated in place
    Changed,
}

/// Counter adjustments produced by a vote toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteDelta {
    pub outcome: ToggleOutcome,
    pub likes: i64,
    pub dislikes: i64,
}

impl VoteDelta {
    /// Decide the outcome of a vote request given the caller's existing vote
    /// polarity (`Some(true)` = dislike) and the requested polarity.
    pub fn plan(existing: Option<bool>, is_dislike: bool) -> Self {
        let (like, dislike) = if is_dislike { (0, 1) } else { (1, 0) };
        match existing {
            None => Self {
                outcome: ToggleOutcome::Created,
                likes: like,
                dislikes: dislike,
            },
            Some(prev) if prev == is_dislike => Self {
                outcome: ToggleOutcome::Removed,
                likes: -like,
                dislikes: -dislike,
            },
            Some(_) => Self {
                outcome: ToggleOutcome::Changed,
                // Moving from the other polarity: take one away there, add one here
                likes: like - dislike,
                dislikes: dislike - like,
            },
        }
    }
}

/// Current vote state of a target, returned to the caller after a toggle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteResult {
    pub outcome: ToggleOutcome,
    pub likes_count: i64,
    pub dislikes_count: i64,
    /// The caller's vote after the toggle, `None` when removed
    pub is_dislike: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_plan_create() {
        let delta = VoteDelta::plan(None, false);
        assert_eq!(delta.outcome, ToggleOutcome::Created);
        assert_eq!((delta.likes, delta.dislikes), (1, 0));

        let delta = VoteDelta::plan(None, true);
        assert_eq!((delta.likes, delta.dislikes), (0, 1));
    }

    #[test]
    fn test_plan_remove() {
        let delta = VoteDelta::plan(Some(false), false);
        assert_eq!(delta.outcome, ToggleOutcome::Removed);
        assert_eq!((delta.likes, delta.dislikes), (-1, 0));
    }

    #[test]
    fn test_plan_change() {
        let delta = VoteDelta::plan(Some(false), true);
        assert_eq!(delta.outcome, ToggleOutcome::Changed);
        assert_eq!((delta.likes, delta.dislikes), (-1, 1));

        let delta = VoteDelta::plan(Some(true), false);
        assert_eq!((delta.likes, delta.dislikes), (1, -1));
    }

    proptest! {
        /// Replaying any sequence of requests through `plan` keeps the
        /// counters equal to the number of live votes of each polarity.
        #[test]
        fn counters_track_live_vote(requests in prop::collection::vec(any::<bool>(), 0..50)) {
            let mut current: Option<bool> = None;
            let (mut likes, mut dislikes) = (0i64, 0i64);

            for is_dislike in requests {
                let delta = VoteDelta::plan(current, is_dislike);
                likes += delta.likes;
                dislikes += delta.dislikes;
                current = match delta.outcome {
                    ToggleOutcome::Removed => None,
                    _ => Some(is_dislike),
                };

                prop_assert_eq!(likes, (current == Some(false)) as i64);
                prop_assert_eq!(dislikes, (current == Some(true)) as i64);
            }
        }

        /// Switching polarity never changes the total number of votes.
        #[test]
        fn change_preserves_total(prev in any::<bool>()) {
            let delta = VoteDelta::plan(Some(prev), !prev);
            prop_assert_eq!(delta.outcome, ToggleOutcome::Changed);
            prop_assert_eq!(delta.likes + delta.dislikes, 0);
        }
    }
}
