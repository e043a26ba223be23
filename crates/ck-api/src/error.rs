//! API error handling
//!
//! Every failure leaves a handler as an `ApiError`, rendered as a JSON body
//! with a stable error identifier.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ck_core::ValidationError;
use ck_db::RepositoryError;
use ck_files::StorageError;
use serde::Serialize;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Validation(ValidationError),
    BadRequest(String),
    Forbidden(String),
    PayloadTooLarge(String),
    Unavailable(String),
    Internal(String),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }

    /// Upload rejected for exceeding `max` bytes
    pub fn too_large(max: usize) -> Self {
        ApiError::PayloadTooLarge(format!(
            "File size exceeds maximum allowed size of {} bytes",
            max
        ))
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        ApiError::Unavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn identifier(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::Validation(_) => "validation_error",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::Unavailable(_) => "unavailable",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = self.identifier();
        let body = match self {
            ApiError::Validation(err) => ErrorBody {
                error,
                detail: err.message(),
                field: Some(err.field),
            },
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ErrorBody {
                    error,
                    detail: "Internal server error".into(),
                    field: None,
                }
            }
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Forbidden(msg)
            | ApiError::PayloadTooLarge(msg)
            | ApiError::Unavailable(msg) => ErrorBody {
                error,
                detail: msg,
                field: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.into())
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            RepositoryError::Validation(inner) => ApiError::Validation(inner),
            RepositoryError::Database(e) => ApiError::internal(e.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => ApiError::not_found(err.to_string()),
            StorageError::Forbidden(_) => ApiError::forbidden("Access denied"),
            StorageError::InvalidName(_) => ApiError::bad_request("Invalid filename"),
            StorageError::TooLarge { max, .. } => ApiError::too_large(max),
            StorageError::IoError(_) | StorageError::NameExhausted(_) => {
                ApiError::internal(err.to_string())
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let not_found: ApiError = RepositoryError::not_found("Item", 7).into();
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let invalid: ApiError = ValidationError::unknown_field("nonexistent").into();
        assert_eq!(invalid.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let too_large: ApiError = StorageError::TooLarge { size: 11, max: 10 }.into();
        assert_eq!(too_large.status_code(), StatusCode::PAYLOAD_TOO_LARGE);

        let traversal: ApiError = StorageError::Forbidden("../x".into()).into();
        assert_eq!(traversal.status_code(), StatusCode::FORBIDDEN);

        let io: ApiError = StorageError::IoError(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        ))
        .into();
        assert_eq!(io.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_messages() {
        match ApiError::from(RepositoryError::not_found("Item", 7)) {
            ApiError::NotFound(msg) => assert_eq!(msg, "Item with id 7 not found"),
            other => panic!("unexpected error: {other:?}"),
        }
        match ApiError::from(StorageError::NotFound("a.txt".into())) {
            ApiError::NotFound(msg) => assert_eq!(msg, "File a.txt not found"),
            other => panic!("unexpected error: {other:?}"),
        }
        match ApiError::from(StorageError::Forbidden("../x".into())) {
            ApiError::Forbidden(msg) => assert_eq!(msg, "Access denied"),
            other => panic!("unexpected error: {other:?}"),
        }
        match ApiError::from(StorageError::TooLarge { size: 11, max: 10 }) {
            ApiError::PayloadTooLarge(msg) => {
                assert_eq!(msg, "File size exceeds maximum allowed size of 10 bytes")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
