//! Error responses for the REST layer.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use shared::{ErrorResponse, ParseEnumError};
use tracing::error;

use crate::domain::DomainError;

const INTERNAL_MESSAGE: &str = "An unexpected error occurred";

/// Anything a handler can fail with. Rendered as [`ErrorResponse`].
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    fn status_and_label(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Domain(e) => match e {
                DomainError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                DomainError::BusinessRule(_) => (StatusCode::BAD_REQUEST, "BUSINESS_RULE_VIOLATION"),
                DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
                DomainError::Duplicate(_) => (StatusCode::CONFLICT, "DUPLICATE_RESOURCE"),
                DomainError::Authentication(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
                DomainError::Database(_) | DomainError::Storage(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, label) = self.status_and_label();

        let (message, validation_errors) = match self {
            ApiError::Domain(DomainError::Validation(errors)) => {
                ("Validation failed".to_string(), Some(errors.into_map()))
            }
            ApiError::Domain(e) if !e.is_client_error() => {
                // Storage details stay in the log
                error!("Unexpected error while handling request: {:?}", e);
                (INTERNAL_MESSAGE.to_string(), None)
            }
            other => (other.to_string(), None),
        };

        let body = ErrorResponse {
            timestamp: Utc::now(),
            status: status.as_u16(),
            error: label.to_string(),
            message,
            validation_errors,
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<ParseEnumError> for ApiError {
    fn from(e: ParseEnumError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::validation::FieldErrors;

    async fn render(err: ApiError) -> (StatusCode, ErrorResponse) {
        let response = err.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let (status, body) = render(DomainError::not_found("Child", 7).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.status, 404);
        assert_eq!(body.error, "NOT_FOUND");
        assert_eq!(body.message, "Child not found: 7");
        assert!(body.validation_errors.is_none());
    }

    #[tokio::test]
    async fn test_validation_body_lists_fields() {
        let mut errors = FieldErrors::new();
        errors.add("first_name", "must not be empty");
        let (status, body) = render(DomainError::Validation(errors).into()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "VALIDATION_FAILED");
        let fields = body.validation_errors.unwrap();
        assert_eq!(fields["first_name"], "must not be empty");
    }

    #[tokio::test]
    async fn test_storage_error_is_generic() {
        let err = DomainError::from(anyhow::anyhow!("database is locked"));
        let (status, body) = render(err.into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "INTERNAL_ERROR");
        assert_eq!(body.message, INTERNAL_MESSAGE);
    }

    #[tokio::test]
    async fn test_duplicate_and_business_rule_codes() {
        let (status, body) = render(DomainError::duplicate("taken").into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.error, "DUPLICATE_RESOURCE");

        let (status, body) = render(DomainError::business("no").into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "BUSINESS_RULE_VIOLATION");
    }
}
