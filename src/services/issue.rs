//! Issue service
//!
//! Issue lifecycle and listing. Creating or deleting an issue changes the
//! author's contributor score, so both schedule a recompute.

use crate::db::repositories::{IssueFields, IssueRepository};
use crate::models::{
    normalize_tag_name, ContentType, CreateIssueInput, Issue, IssueFilter, IssueStatus,
    ListParams, PagedResult, TaggedContent, UpdateIssueInput, User,
};
use crate::services::error::{require_text, ServiceError, ServiceResult};
use crate::services::score::ScoreService;
use crate::services::snippet::{MAX_CODE_LEN, MAX_LANGUAGE_LEN, MAX_TITLE_LEN};
use crate::services::tag::TagService;
use anyhow::Context;
use std::sync::Arc;

pub const MAX_DESCRIPTION_LEN: usize = 20_000;

pub struct IssueService {
    issue_repo: Arc<dyn IssueRepository>,
    tags: Arc<TagService>,
    score: Arc<ScoreService>,
}

impl IssueService {
    pub fn new(
        issue_repo: Arc<dyn IssueRepository>,
        tags: Arc<TagService>,
        score: Arc<ScoreService>,
    ) -> Self {
        Self {
            issue_repo,
            tags,
            score,
        }
    }

    pub async fn create(&self, author: &User, input: CreateIssueInput) -> ServiceResult<Issue> {
        let code = non_empty(input.code.as_deref());
        let language = non_empty(input.language.as_deref().map(str::trim));
        let fields = IssueFields {
            title: input.title.trim(),
            description: &input.description,
            code,
            language,
        };
        validate(&fields)?;

        let issue = self
            .issue_repo
            .create(author.id, fields)
            .await
            .context("Failed to create issue")?;
        self.score.schedule(author.id);
        tracing::debug!(issue_id = issue.id, author_id = author.id, "Issue created");

        if let Some(tags) = input.tags.filter(|t| !t.is_empty()) {
            self.tags
                .set_content_tags(author.id, content_ref(issue.id), &tags)
                .await?;
            return self.get(issue.id).await;
        }
        Ok(issue)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Issue> {
        self.issue_repo
            .get_by_id(id)
            .await
            .context("Failed to load issue")?
            .ok_or_else(|| ServiceError::not_found("Issue"))
    }

    /// Only the author may edit an issue
    pub async fn update(&self, user: &User, id: i64, input: UpdateIssueInput) -> ServiceResult<Issue> {
        let issue = self.get(id).await?;
        if issue.author_id != user.id {
            return Err(ServiceError::forbidden("Only the author can edit this issue"));
        }

        let code = match input.code.as_deref() {
            Some(raw) => non_empty(Some(raw)),
            None => issue.code.as_deref(),
        };
        let language = match input.language.as_deref() {
            Some(raw) => non_empty(Some(raw.trim())),
            None => issue.language.as_deref(),
        };
        let fields = IssueFields {
            title: input.title.as_deref().map(str::trim).unwrap_or(&issue.title),
            description: input.description.as_deref().unwrap_or(&issue.description),
            code,
            language,
        };
        validate(&fields)?;

        self.issue_repo
            .update(id, fields)
            .await
            .context("Failed to update issue")?;

        if let Some(tags) = input.tags {
            self.tags
                .set_content_tags(issue.author_id, content_ref(id), &tags)
                .await?;
        }
        self.get(id).await
    }

    pub async fn delete(&self, user: &User, id: i64) -> ServiceResult<()> {
        let issue = self.get(id).await?;
        if !user.can_modify(issue.author_id) {
            return Err(ServiceError::forbidden("Only the author can delete this issue"));
        }
        self.issue_repo
            .soft_delete(id)
            .await
            .context("Failed to delete issue")?;
        self.score.schedule(issue.author_id);
        tracing::info!(issue_id = id, by = user.id, "Issue deleted");
        Ok(())
    }

    /// Close an issue. Closed issues accept no new solutions.
    pub async fn close(&self, user: &User, id: i64) -> ServiceResult<Issue> {
        let issue = self.get(id).await?;
        if issue.author_id != user.id {
            return Err(ServiceError::forbidden("Only the author can close this issue"));
        }
        if issue.status == IssueStatus::Closed {
            return Err(ServiceError::validation("Issue is already closed"));
        }
        self.issue_repo
            .set_status(id, IssueStatus::Closed)
            .await
            .context("Failed to close issue")?;
        self.get(id).await
    }

    pub async fn list(
        &self,
        mut filter: IssueFilter,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<Issue>> {
        filter.tag = filter.tag.as_deref().and_then(normalize_tag_name);
        Ok(self
            .issue_repo
            .list(&filter, params)
            .await
            .context("Failed to list issues")?)
    }
}

fn validate(fields: &IssueFields<'_>) -> ServiceResult<()> {
    require_text("Title", fields.title, MAX_TITLE_LEN)?;
    require_text("Description", fields.description, MAX_DESCRIPTION_LEN)?;
    if let Some(code) = fields.code {
        require_text("Code", code, MAX_CODE_LEN)?;
    }
    if let Some(language) = fields.language {
        require_text("Language", language, MAX_LANGUAGE_LEN)?;
    }
    Ok(())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn content_ref(id: i64) -> TaggedContent {
    TaggedContent {
        content_type: ContentType::Issue,
        content_id: id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxContentRepository, SqlxIssueRepository, SqlxScoreRepository, SqlxTagRepository,
        SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations, DbPool};
    use crate::models::UserRole;

    async fn setup_test_service() -> (DbPool, IssueService, Arc<ScoreService>) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let tags = Arc::new(TagService::new(
            SqlxTagRepository::boxed(pool.clone()),
            SqlxContentRepository::boxed(pool.clone()),
        ));
        let score = Arc::new(ScoreService::new(
            SqlxScoreRepository::boxed(pool.clone()),
            SqlxUserRepository::boxed(pool.clone()),
        ));
        let service = IssueService::new(SqlxIssueRepository::boxed(pool.clone()), tags, score.clone());
        (pool, service, score)
    }

    async fn create_user(pool: &DbPool, name: &str, role: UserRole) -> User {
        SqlxUserRepository::new(pool.clone())
            .create(&User::new(
                name.to_string(),
                format!("{}@example.com", name),
                None,
                role,
            ))
            .await
            .unwrap()
    }

    fn input(title: &str) -> CreateIssueInput {
        CreateIssueInput {
            title: title.to_string(),
            description: "It panics".to_string(),
            code: Some("   ".to_string()),
            language: None,
            tags: Some(vec!["Bug".to_string()]),
        }
    }

    #[tokio::test]
    async fn test_create_and_filter() {
        let (pool, service, score) = setup_test_service().await;
        let alice = create_user(&pool, "alice", UserRole::User).await;

        let issue = service.create(&alice, input("Crash on start")).await.unwrap();
        assert_eq!(issue.status, IssueStatus::Open);
        assert!(issue.code.is_none());
        assert_eq!(issue.tags, vec!["bug"]);
        assert_eq!(score.recalculate(alice.id).await.unwrap(), 2);

        let other = service.create(&alice, input("Second")).await.unwrap();
        service.close(&alice, other.id).await.unwrap();

        let open = service
            .list(
                IssueFilter {
                    status: Some(IssueStatus::Open),
                    ..Default::default()
                },
                &ListParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(open.total, 1);
        assert_eq!(open.items[0].id, issue.id);
    }

    #[tokio::test]
    async fn test_update_is_author_only() {
        let (pool, service, _) = setup_test_service().await;
        let admin = create_user(&pool, "admin", UserRole::Admin).await;
        let alice = create_user(&pool, "alice", UserRole::User).await;
        let issue = service.create(&alice, input("Crash")).await.unwrap();

        let change = UpdateIssueInput {
            language: Some("rust".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            service.update(&admin, issue.id, change.clone()).await,
            Err(ServiceError::Forbidden(_))
        ));
        let updated = service.update(&alice, issue.id, change).await.unwrap();
        assert_eq!(updated.language.as_deref(), Some("rust"));
        assert_eq!(updated.title, "Crash");
    }

    #[tokio::test]
    async fn test_close_and_delete() {
        let (pool, service, score) = setup_test_service().await;
        let admin = create_user(&pool, "admin", UserRole::Admin).await;
        let alice = create_user(&pool, "alice", UserRole::User).await;
        let bob = create_user(&pool, "bob", UserRole::User).await;
        let issue = service.create(&alice, input("Crash")).await.unwrap();

        assert!(matches!(
            service.close(&bob, issue.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        let closed = service.close(&alice, issue.id).await.unwrap();
        assert_eq!(closed.status, IssueStatus::Closed);
        assert!(matches!(
            service.close(&alice, issue.id).await,
            Err(ServiceError::ValidationError(_))
        ));

        assert!(matches!(
            service.delete(&bob, issue.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        service.delete(&admin, issue.id).await.unwrap();
        assert!(matches!(service.get(issue.id).await, Err(ServiceError::NotFound(_))));
        assert_eq!(score.recalculate(alice.id).await.unwrap(), 0);
    }
}
