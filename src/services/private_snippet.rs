//! Private snippet service
//!
//! Owner-only snippets with an immutable version history. Changing the code
//! appends a version; title and language edits don't. Other users always
//! get `NotFound`, so the existence of a private snippet is never revealed.

use crate::db::repositories::PrivateSnippetRepository;
use crate::models::{
    CreatePrivateSnippetInput, ListParams, PagedResult, PrivateSnippet, PrivateSnippetVersion,
    UpdatePrivateSnippetInput, User,
};
use crate::services::error::{require_text, ServiceError, ServiceResult};
use crate::services::snippet::{MAX_CODE_LEN, MAX_LANGUAGE_LEN, MAX_TITLE_LEN};
use anyhow::Context;
use std::sync::Arc;

const MAX_CHANGE_NOTE_LEN: usize = 500;

pub struct PrivateSnippetService {
    repo: Arc<dyn PrivateSnippetRepository>,
}

impl PrivateSnippetService {
    pub fn new(repo: Arc<dyn PrivateSnippetRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(
        &self,
        owner: &User,
        input: CreatePrivateSnippetInput,
    ) -> ServiceResult<PrivateSnippet> {
        let title = input.title.trim();
        let language = input.language.trim();
        require_text("Title", title, MAX_TITLE_LEN)?;
        require_text("Language", language, MAX_LANGUAGE_LEN)?;
        require_text("Code", &input.code, MAX_CODE_LEN)?;

        Ok(self
            .repo
            .create(owner.id, title, language, &input.code)
            .await
            .context("Failed to create private snippet")?)
    }

    pub async fn get(&self, owner: &User, id: i64) -> ServiceResult<PrivateSnippet> {
        let snippet = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to load private snippet")?
            .filter(|s| s.owner_id == owner.id)
            .ok_or_else(|| ServiceError::not_found("Snippet"))?;
        Ok(snippet)
    }

    pub async fn list(
        &self,
        owner: &User,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<PrivateSnippet>> {
        Ok(self
            .repo
            .list_by_owner(owner.id, params)
            .await
            .context("Failed to list private snippets")?)
    }

    pub async fn update(
        &self,
        owner: &User,
        id: i64,
        input: UpdatePrivateSnippetInput,
    ) -> ServiceResult<PrivateSnippet> {
        let snippet = self.get(owner, id).await?;

        if input.title.is_some() || input.language.is_some() {
            let title = input.title.as_deref().map(str::trim).unwrap_or(&snippet.title);
            let language = input
                .language
                .as_deref()
                .map(str::trim)
                .unwrap_or(&snippet.language);
            require_text("Title", title, MAX_TITLE_LEN)?;
            require_text("Language", language, MAX_LANGUAGE_LEN)?;
            self.repo
                .update_meta(id, title, language)
                .await
                .context("Failed to update private snippet")?;
        }

        if let Some(code) = input.code.as_deref() {
            require_text("Code", code, MAX_CODE_LEN)?;
            // Saving identical code is not a new revision
            if code != snippet.code {
                let note = clean_note(input.change_note.as_deref())?;
                let version = self
                    .repo
                    .add_version(id, code, note.as_deref())
                    .await
                    .context("Failed to save snippet version")?;
                tracing::debug!(snippet_id = id, version, "Private snippet version added");
            }
        }

        self.get(owner, id).await
    }

    pub async fn versions(&self, owner: &User, id: i64) -> ServiceResult<Vec<PrivateSnippetVersion>> {
        self.get(owner, id).await?;
        Ok(self
            .repo
            .list_versions(id)
            .await
            .context("Failed to list versions")?)
    }

    pub async fn version(
        &self,
        owner: &User,
        id: i64,
        version: i64,
    ) -> ServiceResult<PrivateSnippetVersion> {
        self.get(owner, id).await?;
        self.repo
            .get_version(id, version)
            .await
            .context("Failed to load version")?
            .ok_or_else(|| ServiceError::not_found("Version"))
    }

    /// Copy an old version's code into a new version
    pub async fn restore(&self, owner: &User, id: i64, version: i64) -> ServiceResult<PrivateSnippet> {
        let old = self.version(owner, id, version).await?;
        let note = format!("Restored from version {}", old.version);
        self.repo
            .add_version(id, &old.code, Some(&note))
            .await
            .context("Failed to restore version")?;
        self.get(owner, id).await
    }

    pub async fn delete(&self, owner: &User, id: i64) -> ServiceResult<()> {
        self.get(owner, id).await?;
        self.repo
            .soft_delete(id)
            .await
            .context("Failed to delete private snippet")?;
        Ok(())
    }
}

fn clean_note(raw: Option<&str>) -> ServiceResult<Option<String>> {
    match raw.map(str::trim).filter(|n| !n.is_empty()) {
        Some(note) => {
            require_text("Change note", note, MAX_CHANGE_NOTE_LEN)?;
            Ok(Some(note.to_string()))
        }
        None => Ok(None),
    }
}
