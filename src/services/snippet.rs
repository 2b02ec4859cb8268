//! Public snippet service

use crate::db::repositories::{SnippetFields, SnippetRepository};
use crate::models::{
    normalize_tag_name, ContentType, CreateSnippetInput, ListParams, PagedResult, Snippet,
    SnippetFilter, TaggedContent, UpdateSnippetInput, User,
};
use crate::services::error::{require_text, ServiceError, ServiceResult};
use crate::services::tag::TagService;
use anyhow::Context;
use std::sync::Arc;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 2_000;
pub const MAX_CODE_LEN: usize = 100_000;
pub const MAX_LANGUAGE_LEN: usize = 50;

pub struct SnippetService {
    snippet_repo: Arc<dyn SnippetRepository>,
    tags: Arc<TagService>,
}

impl SnippetService {
    pub fn new(snippet_repo: Arc<dyn SnippetRepository>, tags: Arc<TagService>) -> Self {
        Self { snippet_repo, tags }
    }

    pub async fn create(&self, author: &User, input: CreateSnippetInput) -> ServiceResult<Snippet> {
        let description = clean_description(input.description.as_deref())?;
        let fields = SnippetFields {
            title: input.title.trim(),
            description: description.as_deref(),
            code: &input.code,
            language: input.language.trim(),
        };
        validate(&fields)?;

        let snippet = self
            .snippet_repo
            .create(author.id, fields)
            .await
            .context("Failed to create snippet")?;

        if let Some(tags) = input.tags.filter(|t| !t.is_empty()) {
            self.tags
                .set_content_tags(author.id, content_ref(snippet.id), &tags)
                .await?;
            return self.get(snippet.id).await;
        }
        Ok(snippet)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Snippet> {
        self.snippet_repo
            .get_by_id(id)
            .await
            .context("Failed to load snippet")?
            .ok_or_else(|| ServiceError::not_found("Snippet"))
    }

    pub async fn update(
        &self,
        user: &User,
        id: i64,
        input: UpdateSnippetInput,
    ) -> ServiceResult<Snippet> {
        let snippet = self.get(id).await?;
        if !user.can_modify(snippet.author_id) {
            return Err(ServiceError::forbidden("Only the author can edit this snippet"));
        }

        let description = match input.description.as_deref() {
            Some(raw) => clean_description(Some(raw))?,
            None => snippet.description.clone(),
        };
        let fields = SnippetFields {
            title: input.title.as_deref().map(str::trim).unwrap_or(&snippet.title),
            description: description.as_deref(),
            code: input.code.as_deref().unwrap_or(&snippet.code),
            language: input
                .language
                .as_deref()
                .map(str::trim)
                .unwrap_or(&snippet.language),
        };
        validate(&fields)?;

        self.snippet_repo
            .update(id, fields)
            .await
            .context("Failed to update snippet")?;

        if let Some(tags) = input.tags {
            self.tags
                .set_content_tags(snippet.author_id, content_ref(id), &tags)
                .await?;
        }
        self.get(id).await
    }

    pub async fn delete(&self, user: &User, id: i64) -> ServiceResult<()> {
        let snippet = self.get(id).await?;
        if !user.can_modify(snippet.author_id) {
            return Err(ServiceError::forbidden("Only the author can delete this snippet"));
        }
        self.snippet_repo
            .soft_delete(id)
            .await
            .context("Failed to delete snippet")?;
        tracing::info!(snippet_id = id, by = user.id, "Snippet deleted");
        Ok(())
    }

    pub async fn list(
        &self,
        mut filter: SnippetFilter,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<Snippet>> {
        filter.tag = filter.tag.as_deref().and_then(normalize_tag_name);
        filter.language = filter
            .language
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        Ok(self
            .snippet_repo
            .list(&filter, params)
            .await
            .context("Failed to list snippets")?)
    }
}

fn validate(fields: &SnippetFields<'_>) -> ServiceResult<()> {
    require_text("Title", fields.title, MAX_TITLE_LEN)?;
    require_text("Code", fields.code, MAX_CODE_LEN)?;
    require_text("Language", fields.language, MAX_LANGUAGE_LEN)
}

fn clean_description(raw: Option<&str>) -> ServiceResult<Option<String>> {
    match raw.map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) if d.chars().count() > MAX_DESCRIPTION_LEN => Err(ServiceError::validation(format!(
            "Description must be at most {} characters",
            MAX_DESCRIPTION_LEN
        ))),
        other => Ok(other.map(str::to_string)),
    }
}

fn content_ref(id: i64) -> TaggedContent {
    TaggedContent {
        content_type: ContentType::Snippet,
        content_id: id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxContentRepository, SqlxSnippetRepository, SqlxTagRepository, SqlxUserRepository,
        UserRepository,
    };
    use crate::db::{create_test_pool, migrations, DbPool};
    use crate::models::UserRole;

    async fn setup_test_service() -> (DbPool, SnippetService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let tags = Arc::new(TagService::new(
            SqlxTagRepository::boxed(pool.clone()),
            SqlxContentRepository::boxed(pool.clone()),
        ));
        (pool.clone(), SnippetService::new(SqlxSnippetRepository::boxed(pool), tags))
    }

    async fn create_user(pool: &DbPool, name: &str) -> User {
        SqlxUserRepository::new(pool.clone())
            .create(&User::new(
                name.to_string(),
                format!("{}@example.com", name),
                None,
                UserRole::User,
            ))
            .await
            .unwrap()
    }

    fn input(language: &str) -> CreateSnippetInput {
        CreateSnippetInput {
            title: "Hello world".to_string(),
            description: Some("  ".to_string()),
            code: "fn main() {}".to_string(),
            language: language.to_string(),
            tags: Some(vec!["Demo".to_string()]),
        }
    }

    #[tokio::test]
    async fn test_create_and_filter_by_language() {
        let (pool, service) = setup_test_service().await;
        let alice = create_user(&pool, "alice").await;

        let rust = service.create(&alice, input("Rust")).await.unwrap();
        assert!(rust.description.is_none());
        assert_eq!(rust.tags, vec!["demo"]);
        service.create(&alice, input("python")).await.unwrap();

        let filtered = service
            .list(
                SnippetFilter {
                    language: Some("rust".to_string()),
                    ..Default::default()
                },
                &ListParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(filtered.total, 1);
        assert_eq!(filtered.items[0].id, rust.id);

        let by_tag = service
            .list(
                SnippetFilter {
                    tag: Some("demo".to_string()),
                    author_id: Some(alice.id),
                    ..Default::default()
                },
                &ListParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(by_tag.total, 2);
    }

    #[tokio::test]
    async fn test_update_keeps_unset_fields() {
        let (pool, service) = setup_test_service().await;
        let alice = create_user(&pool, "alice").await;
        let bob = create_user(&pool, "bob").await;
        let snippet = service.create(&alice, input("rust")).await.unwrap();

        let change = UpdateSnippetInput {
            code: Some("fn main() { println!(\"hi\"); }".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            service.update(&bob, snippet.id, change.clone()).await,
            Err(ServiceError::Forbidden(_))
        ));

        let updated = service.update(&alice, snippet.id, change).await.unwrap();
        assert!(updated.code.contains("println"));
        assert_eq!(updated.title, "Hello world");
        assert_eq!(updated.language, "rust");
        assert_eq!(updated.tags, vec!["demo"]);

        assert!(matches!(
            service
                .update(
                    &alice,
                    snippet.id,
                    UpdateSnippetInput {
                        code: Some(String::new()),
                        ..Default::default()
                    },
                )
                .await,
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_is_soft() {
        let (pool, service) = setup_test_service().await;
        let alice = create_user(&pool, "alice").await;
        let snippet = service.create(&alice, input("rust")).await.unwrap();

        service.delete(&alice, snippet.id).await.unwrap();
        assert!(matches!(service.get(snippet.id).await, Err(ServiceError::NotFound(_))));

        let flag: bool = sqlx::query_scalar("SELECT is_deleted FROM snippets WHERE id = ?")
            .bind(snippet.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(flag);
    }
}
