//! Common API utilities and shared types

use serde::Deserialize;
use std::str::FromStr;

use crate::api::middleware::{ApiError, AppState};
use crate::models::ListParams;

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Default page size
pub fn default_per_page() -> u32 {
    20
}

/// Basic pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl PaginationQuery {
    pub fn params(&self) -> ListParams {
        ListParams::new(self.page, self.per_page)
    }
}

/// Parse a path or query segment into one of the model enums
pub fn parse_kind<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = anyhow::Error>,
{
    raw.parse::<T>()
        .map_err(|e| ApiError::validation_error(e.to_string()))
}

/// Resolve an optional `author` username filter to a user id
pub async fn resolve_author(state: &AppState, author: Option<&str>) -> Result<Option<i64>, ApiError> {
    match author.map(str::trim).filter(|a| !a.is_empty()) {
        Some(username) => Ok(Some(state.user_service.find_by_username(username).await?.id)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VoteTarget;

    #[test]
    fn test_pagination_is_clamped() {
        let query = PaginationQuery {
            page: 0,
            per_page: 1000,
        };
        let params = query.params();
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 100);
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind::<VoteTarget>("issue").unwrap(), VoteTarget::Issue);
        let err = parse_kind::<VoteTarget>("post").unwrap_err();
        assert_eq!(err.error.code, "VALIDATION_ERROR");
    }
}
