//! Service error type
//!
//! Every service returns `Result<T, ServiceError>`. The API layer maps each
//! variant onto an HTTP status (see `api::middleware::ApiError`).

/// Error type shared by all services
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Target does not exist, is soft-deleted, or is hidden from the caller
    #[error("{0}")]
    NotFound(String),

    /// Caller is known but not allowed to do this
    #[error("{0}")]
    Forbidden(String),

    /// Missing or invalid credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Invalid input or an operation not allowed in the current state
    #[error("{0}")]
    ValidationError(String),

    /// Uniqueness violation
    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn not_found(what: &str) -> Self {
        ServiceError::NotFound(format!("{} not found", what))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::ValidationError(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::Conflict(message.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Reject empty (after trimming) or overlong text
pub(crate) fn require_text(field: &str, value: &str, max_chars: usize) -> ServiceResult<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::validation(format!("{} cannot be empty", field)));
    }
    if value.chars().count() > max_chars {
        return Err(ServiceError::validation(format!(
            "{} must be at most {} characters",
            field, max_chars
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_text() {
        assert!(require_text("Title", "hello", 10).is_ok());
        assert!(matches!(
            require_text("Title", "   ", 10),
            Err(ServiceError::ValidationError(_))
        ));
        assert!(matches!(
            require_text("Title", "ééééé", 4),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(ServiceError::not_found("Post").to_string(), "Post not found");
    }
}
