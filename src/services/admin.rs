//! Admin moderation and platform statistics
//!
//! Content removal reuses each content service's own delete path, so counters,
//! score recomputes and logging behave exactly as for an author deleting
//! their own content.

use crate::db::repositories::{PlatformStats, StatsRepository, UserRepository};
use crate::models::User;
use crate::services::comment::CommentService;
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::issue::IssueService;
use crate::services::post::PostService;
use crate::services::score::ScoreService;
use crate::services::snippet::SnippetService;
use crate::services::solution::SolutionService;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Content kinds an admin can remove
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeratedContent {
    Post,
    Snippet,
    Issue,
    Solution,
    Comment,
}

impl fmt::Display for ModeratedContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModeratedContent::Post => "post",
            ModeratedContent::Snippet => "snippet",
            ModeratedContent::Issue => "issue",
            ModeratedContent::Solution => "solution",
            ModeratedContent::Comment => "comment",
        };
        f.write_str(name)
    }
}

impl FromStr for ModeratedContent {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "post" | "posts" => Ok(ModeratedContent::Post),
            "snippet" | "snippets" => Ok(ModeratedContent::Snippet),
            "issue" | "issues" => Ok(ModeratedContent::Issue),
            "solution" | "solutions" => Ok(ModeratedContent::Solution),
            "comment" | "comments" => Ok(ModeratedContent::Comment),
            _ => Err(anyhow::anyhow!("Invalid content type: {}", s)),
        }
    }
}

pub struct AdminService {
    stats_repo: Arc<dyn StatsRepository>,
    user_repo: Arc<dyn UserRepository>,
    score: Arc<ScoreService>,
    posts: Arc<PostService>,
    snippets: Arc<SnippetService>,
    issues: Arc<IssueService>,
    solutions: Arc<SolutionService>,
    comments: Arc<CommentService>,
}

impl AdminService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        stats_repo: Arc<dyn StatsRepository>,
        user_repo: Arc<dyn UserRepository>,
        score: Arc<ScoreService>,
        posts: Arc<PostService>,
        snippets: Arc<SnippetService>,
        issues: Arc<IssueService>,
        solutions: Arc<SolutionService>,
        comments: Arc<CommentService>,
    ) -> Self {
        Self {
            stats_repo,
            user_repo,
            score,
            posts,
            snippets,
            issues,
            solutions,
            comments,
        }
    }

    pub async fn stats(&self) -> ServiceResult<PlatformStats> {
        Ok(self
            .stats_repo
            .platform_stats()
            .await
            .context("Failed to collect platform stats")?)
    }

    /// Soft-delete any post, snippet, issue, solution or comment
    pub async fn delete_content(
        &self,
        admin: &User,
        kind: ModeratedContent,
        id: i64,
    ) -> ServiceResult<()> {
        if !admin.is_admin() {
            return Err(ServiceError::forbidden("Admin access required"));
        }
        match kind {
            ModeratedContent::Post => self.posts.delete(admin, id).await?,
            ModeratedContent::Snippet => self.snippets.delete(admin, id).await?,
            ModeratedContent::Issue => self.issues.delete(admin, id).await?,
            ModeratedContent::Solution => self.solutions.delete(admin, id).await?,
            ModeratedContent::Comment => self.comments.delete(admin, id).await?,
        }
        tracing::info!(admin_id = admin.id, kind = %kind, id, "Content removed by admin");
        Ok(())
    }

    /// Recompute a user's score now instead of waiting for the next event
    pub async fn recompute_score(&self, user_id: i64) -> ServiceResult<i64> {
        self.user_repo
            .get_by_id(user_id)
            .await
            .context("Failed to load user")?
            .ok_or_else(|| ServiceError::not_found("User"))?;
        self.score.recalculate(user_id).await
    }
}
