//! Solution service

use crate::db::repositories::{IssueRepository, SolutionInsert, SolutionRepository};
use crate::models::{CreateSolutionInput, IssueStatus, Solution, UpdateSolutionInput, User};
use crate::services::error::{require_text, ServiceError, ServiceResult};
use crate::services::score::ScoreService;
use crate::services::snippet::MAX_CODE_LEN;
use anyhow::Context;
use std::sync::Arc;

pub const MAX_CONTENT_LEN: usize = 20_000;

pub struct SolutionService {
    solution_repo: Arc<dyn SolutionRepository>,
    issue_repo: Arc<dyn IssueRepository>,
    score: Arc<ScoreService>,
}

impl SolutionService {
    pub fn new(
        solution_repo: Arc<dyn SolutionRepository>,
        issue_repo: Arc<dyn IssueRepository>,
        score: Arc<ScoreService>,
    ) -> Self {
        Self {
            solution_repo,
            issue_repo,
            score,
        }
    }

    pub async fn create(
        &self,
        author: &User,
        issue_id: i64,
        input: CreateSolutionInput,
    ) -> ServiceResult<Solution> {
        let code = clean_code(input.code.as_deref())?;
        require_text("Content", &input.content, MAX_CONTENT_LEN)?;

        let insert = self
            .solution_repo
            .create(issue_id, author.id, &input.content, code)
            .await
            .context("Failed to create solution")?;

        match insert {
            SolutionInsert::Created(solution) => {
                self.score.schedule(author.id);
                tracing::debug!(solution_id = solution.id, issue_id, "Solution created");
                Ok(solution)
            }
            SolutionInsert::IssueNotFound => Err(ServiceError::not_found("Issue")),
            SolutionInsert::IssueClosed => Err(ServiceError::validation(
                "Issue is closed and no longer accepts solutions",
            )),
        }
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Solution> {
        self.solution_repo
            .get_by_id(id)
            .await
            .context("Failed to load solution")?
            .ok_or_else(|| ServiceError::not_found("Solution"))
    }

    pub async fn update(
        &self,
        user: &User,
        id: i64,
        input: UpdateSolutionInput,
    ) -> ServiceResult<Solution> {
        let solution = self.get(id).await?;
        if solution.author_id != user.id {
            return Err(ServiceError::forbidden("Only the author can edit this solution"));
        }

        let content = input.content.as_deref().unwrap_or(&solution.content);
        require_text("Content", content, MAX_CONTENT_LEN)?;
        let code = match input.code.as_deref() {
            Some(raw) => clean_code(Some(raw))?,
            None => solution.code.as_deref(),
        };

        self.solution_repo
            .update(id, content, code)
            .await
            .context("Failed to update solution")?;
        self.get(id).await
    }

    /// Soft-delete. Deleting the accepted solution reopens its issue.
    pub async fn delete(&self, user: &User, id: i64) -> ServiceResult<()> {
        let solution = self.get(id).await?;
        if !user.can_modify(solution.author_id) {
            return Err(ServiceError::forbidden("Only the author can delete this solution"));
        }
        self.solution_repo
            .soft_delete(id)
            .await
            .context("Failed to delete solution")?;
        self.score.schedule(solution.author_id);
        tracing::info!(solution_id = id, by = user.id, "Solution deleted");
        Ok(())
    }

    /// Accept a solution on behalf of the issue author. An issue accepts at
    /// most one solution.
    pub async fn accept(&self, user: &User, id: i64) -> ServiceResult<Solution> {
        let solution = self.get(id).await?;
        let issue = self
            .issue_repo
            .get_by_id(solution.issue_id)
            .await
            .context("Failed to load issue")?
            .ok_or_else(|| ServiceError::not_found("Issue"))?;

        if issue.author_id != user.id {
            return Err(ServiceError::forbidden(
                "Only the issue author can accept a solution",
            ));
        }

        if issue.status == IssueStatus::Closed {
            return Err(ServiceError::validation("Issue is closed"));
        }

        let accepted = self
            .solution_repo
            .accept(issue.id, solution.id)
            .await
            .context("Failed to accept solution")?;
        if !accepted {
            return Err(ServiceError::validation("Issue already has an accepted solution"));
        }

        self.score.schedule(solution.author_id);
        tracing::info!(solution_id = id, issue_id = issue.id, "Solution accepted");
        self.get(id).await
    }

    pub async fn list_for_issue(&self, issue_id: i64) -> ServiceResult<Vec<Solution>> {
        self.issue_repo
            .get_by_id(issue_id)
            .await
            .context("Failed to load issue")?
            .ok_or_else(|| ServiceError::not_found("Issue"))?;
        Ok(self
            .solution_repo
            .list_by_issue(issue_id)
            .await
            .context("Failed to list solutions")?)
    }
}

fn clean_code(raw: Option<&str>) -> ServiceResult<Option<&str>> {
    match raw.filter(|c| !c.trim().is_empty()) {
        Some(code) => {
            require_text("Code", code, MAX_CODE_LEN)?;
            Ok(Some(code))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        IssueFields, SqlxIssueRepository, SqlxScoreRepository, SqlxSolutionRepository,
        SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations, DbPool};
    use crate::models::{IssueStatus, UserRole};

    struct Fixture {
        pool: DbPool,
        service: SolutionService,
        issues: Arc<dyn IssueRepository>,
        score: Arc<ScoreService>,
    }

    async fn setup_test_service() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let issues = SqlxIssueRepository::boxed(pool.clone());
        let score = Arc::new(ScoreService::new(
            SqlxScoreRepository::boxed(pool.clone()),
            SqlxUserRepository::boxed(pool.clone()),
        ));
        let service = SolutionService::new(
            SqlxSolutionRepository::boxed(pool.clone()),
            issues.clone(),
            score.clone(),
        );
        Fixture {
            pool,
            service,
            issues,
            score,
        }
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

    async fn create_issue(f: &Fixture, author: &User) -> i64 {
        f.issues
            .create(
                author.id,
                IssueFields {
                    title: "Crash",
                    description: "It panics",
                    code: None,
                    language: None,
                },
            )
            .await
            .unwrap()
            .id
    }

    fn answer(content: &str) -> CreateSolutionInput {
        CreateSolutionInput {
            content: content.to_string(),
            code: Some(String::new()),
        }
    }

    #[tokio::test]
    async fn test_create_on_missing_or_closed_issue() {
        let f = setup_test_service().await;
        let alice = create_user(&f.pool, "alice", UserRole::User).await;
        let bob = create_user(&f.pool, "bob", UserRole::User).await;

        assert!(matches!(
            f.service.create(&bob, 999, answer("Try this")).await,
            Err(ServiceError::NotFound(_))
        ));

        let issue_id = create_issue(&f, &alice).await;
        let solution = f.service.create(&bob, issue_id, answer("Try this")).await.unwrap();
        assert!(solution.code.is_none());
        assert_eq!(f.score.recalculate(bob.id).await.unwrap(), 5);

        f.issues.set_status(issue_id, IssueStatus::Closed).await.unwrap();
        assert!(matches!(
            f.service.create(&bob, issue_id, answer("Again")).await,
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_accept_rules() {
        let f = setup_test_service().await;
        let alice = create_user(&f.pool, "alice", UserRole::User).await;
        let bob = create_user(&f.pool, "bob", UserRole::User).await;
        let issue_id = create_issue(&f, &alice).await;

        let first = f.service.create(&bob, issue_id, answer("One")).await.unwrap();
        let second = f.service.create(&bob, issue_id, answer("Two")).await.unwrap();

        assert!(matches!(
            f.service.accept(&bob, first.id).await,
            Err(ServiceError::Forbidden(_))
        ));

        let accepted = f.service.accept(&alice, first.id).await.unwrap();
        assert!(accepted.is_accepted);
        let issue = f.issues.get_by_id(issue_id).await.unwrap().unwrap();
        assert_eq!(issue.status, IssueStatus::Resolved);
        assert_eq!(issue.accepted_solution_id, Some(first.id));
        assert_eq!(f.score.recalculate(bob.id).await.unwrap(), 5 + 5 + 15);

        assert!(matches!(
            f.service.accept(&alice, second.id).await,
            Err(ServiceError::ValidationError(_))
        ));

        let listed = f.service.list_for_issue(issue_id).await.unwrap();
        assert_eq!(listed[0].id, first.id);
    }

    #[tokio::test]
    async fn test_delete_accepted_reopens_issue() {
        let f = setup_test_service().await;
        let admin = create_user(&f.pool, "admin", UserRole::Admin).await;
        let alice = create_user(&f.pool, "alice", UserRole::User).await;
        let bob = create_user(&f.pool, "bob", UserRole::User).await;
        let issue_id = create_issue(&f, &alice).await;
        let solution = f.service.create(&bob, issue_id, answer("One")).await.unwrap();
        f.service.accept(&alice, solution.id).await.unwrap();

        assert!(matches!(
            f.service.delete(&alice, solution.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        f.service.delete(&admin, solution.id).await.unwrap();

        let issue = f.issues.get_by_id(issue_id).await.unwrap().unwrap();
        assert_eq!(issue.status, IssueStatus::Open);
        assert_eq!(issue.accepted_solution_id, None);
        assert_eq!(issue.solutions_count, 0);
        assert_eq!(f.score.recalculate(bob.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_closed_issue_stays_closed() {
        let f = setup_test_service().await;
        let admin = create_user(&f.pool, "admin", UserRole::Admin).await;
        let alice = create_user(&f.pool, "alice", UserRole::User).await;
        let bob = create_user(&f.pool, "bob", UserRole::User).await;

        let issue_id = create_issue(&f, &alice).await;
        let pending = f.service.create(&bob, issue_id, answer("One")).await.unwrap();
        f.issues.set_status(issue_id, IssueStatus::Closed).await.unwrap();
        assert!(matches!(
            f.service.accept(&alice, pending.id).await,
            Err(ServiceError::ValidationError(_))
        ));
        let issue = f.issues.get_by_id(issue_id).await.unwrap().unwrap();
        assert_eq!(issue.status, IssueStatus::Closed);
        assert_eq!(issue.accepted_solution_id, None);

        let other_issue = create_issue(&f, &alice).await;
        let solution = f.service.create(&bob, other_issue, answer("Two")).await.unwrap();
        f.service.accept(&alice, solution.id).await.unwrap();
        f.issues.set_status(other_issue, IssueStatus::Closed).await.unwrap();
        f.service.delete(&admin, solution.id).await.unwrap();

        let issue = f.issues.get_by_id(other_issue).await.unwrap().unwrap();
        assert_eq!(issue.status, IssueStatus::Closed);
        assert_eq!(issue.accepted_solution_id, None);
    }

    #[tokio::test]
    async fn test_update_by_author_only() {
        let f = setup_test_service().await;
        let alice = create_user(&f.pool, "alice", UserRole::User).await;
        let bob = create_user(&f.pool, "bob", UserRole::User).await;
        let issue_id = create_issue(&f, &alice).await;
        let solution = f.service.create(&bob, issue_id, answer("One")).await.unwrap();

        let change = UpdateSolutionInput {
            content: None,
            code: Some("let x = 1;".to_string()),
        };
        assert!(matches!(
            f.service.update(&alice, solution.id, change.clone()).await,
            Err(ServiceError::Forbidden(_))
        ));
        let updated = f.service.update(&bob, solution.id, change).await.unwrap();
        assert_eq!(updated.content, "One");
        assert_eq!(updated.code.as_deref(), Some("let x = 1;"));
    }
}
