//! HTTP error type and its JSON rendering.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use studypulse_core::store::StorageError;
use studypulse_core::StudyError;

/// Errors surfaced by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    Document(String),

    #[error("{0}")]
    Generation(String),

    #[error("{0}")]
    Internal(String),
}

impl From<StudyError> for ApiError {
    fn from(e: StudyError) -> Self {
        match e {
            StudyError::Validation(msg) => ApiError::Validation(msg),
            StudyError::NotFound(msg) => ApiError::NotFound(msg),
            StudyError::Forbidden(msg) => ApiError::Forbidden(msg),
            StudyError::Document(e) => ApiError::Document(e.to_string()),
            e @ StudyError::Generation(_) => ApiError::Generation(e.to_string()),
            StudyError::Storage(e) => e.into(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => ApiError::NotFound("Not found".into()),
            StorageError::Conflict => ApiError::Conflict("Duplicate entry".into()),
            other => ApiError::Internal(format!("storage error: {other}")),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Document(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Generation(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // internal details stay in the log
        let message = match self {
            ApiError::Internal(detail) => {
                error!(%detail, "internal error");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(status).json(json!({
            "success": false,
            "error": {
                "message": message,
                "statusCode": status.as_u16(),
            }
        }))
    }
}
