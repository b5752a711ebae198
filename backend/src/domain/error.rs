use std::fmt::Display;

use super::validation::FieldErrors;

pub type DomainResult<T> = Result<T, DomainError>;

/// Errors produced by the domain services.
///
/// `NotFound`, `BusinessRule`, `Validation`, `Duplicate` and `Authentication`
/// are client errors and carry a message that is safe to show. The remaining
/// variants wrap unexpected storage failures.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("{0}")]
    BusinessRule(String),

    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    Authentication(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl DomainError {
    pub fn not_found(entity: &'static str, key: impl Display) -> Self {
        DomainError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn business(message: impl Into<String>) -> Self {
        DomainError::BusinessRule(message.into())
    }

    pub fn duplicate(message: impl Into<String>) -> Self {
        DomainError::Duplicate(message.into())
    }

    /// True for errors caused by the request rather than by the server
    pub fn is_client_error(&self) -> bool {
        !matches!(self, DomainError::Database(_) | DomainError::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = DomainError::not_found("Child", 42);
        assert_eq!(err.to_string(), "Child not found: 42");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_storage_errors_are_not_client_errors() {
        let err = DomainError::from(anyhow::anyhow!("disk on fire"));
        assert!(!err.is_client_error());
    }
}
