//! Contributor score

use serde::{Deserialize, Serialize};

pub const ISSUE_POINTS: i64 = 2;
pub const SOLUTION_POINTS: i64 = 5;
pub const ACCEPTED_SOLUTION_POINTS: i64 = 15;
pub const COMMENT_POINTS: i64 = 1;

/// Non-deleted contributions of one user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributions {
    pub issues: i64,
    pub solutions: i64,
    pub accepted_solutions: i64,
    pub comments: i64,
}

impl Contributions {
    /// Accepted solutions also count as solutions, so each one is worth
    /// `SOLUTION_POINTS + ACCEPTED_SOLUTION_POINTS` in total.
    pub fn score(&self) -> i64 {
        ISSUE_POINTS * self.issues
            + SOLUTION_POINTS * self.solutions
            + ACCEPTED_SOLUTION_POINTS * self.accepted_solutions
            + COMMENT_POINTS * self.comments
    }
}

/// Leaderboard row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub user_id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub contributor_score: i64,
}
