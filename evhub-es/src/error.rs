//! Error types for evhub-es

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::submission::uploader::UploadFailure;
use crate::validate::FieldErrors;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed owner credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - e.g., submission cancelled mid-flight
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Draft failed validation (422), carries per-field rule violations
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// One or more asset uploads failed (502)
    #[error("{} upload(s) failed", .0.len())]
    UploadFailed(Vec<UploadFailure>),

    /// Record store temporarily unavailable (503), safe to retry
    #[error("Record store unavailable: {0}")]
    StoreUnavailable(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// evhub-common error
    #[error("Common error: {0}")]
    Common(#[from] evhub_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                error_body("UNAUTHORIZED", &msg),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, error_body("NOT_FOUND", &msg)),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, error_body("BAD_REQUEST", &msg))
            }
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, error_body("CONFLICT", &msg)),
            ApiError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": {
                        "code": "VALIDATION_FAILED",
                        "message": format!("{}", errors),
                        "fields": errors,
                    }
                }),
            ),
            ApiError::UploadFailed(failures) => (
                StatusCode::BAD_GATEWAY,
                json!({
                    "error": {
                        "code": "UPLOAD_FAILED",
                        "message": format!("{} upload(s) failed", failures.len()),
                        "failures": failures,
                    }
                }),
            ),
            ApiError::StoreUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({
                    "error": {
                        "code": "STORE_UNAVAILABLE",
                        "message": msg,
                        "retryable": true,
                    }
                }),
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("INTERNAL_ERROR", &msg),
            ),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("IO_ERROR", &err.to_string()),
            ),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("INTERNAL_ERROR", &err.to_string()),
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("COMMON_ERROR", &err.to_string()),
            ),
        };

        (status, Json(body)).into_response()
    }
}

fn error_body(code: &str, message: &str) -> serde_json::Value {
    json!({
        "error": {
            "code": code,
            "message": message,
        }
    })
}

impl From<crate::submission::SubmissionError> for ApiError {
    fn from(error: crate::submission::SubmissionError) -> Self {
        use crate::submission::SubmissionError;

        match error {
            SubmissionError::Validation(errors) => ApiError::Validation(errors),
            SubmissionError::Upload(failures) => ApiError::UploadFailed(failures),
            SubmissionError::StoreUnavailable(msg) => ApiError::StoreUnavailable(msg),
            SubmissionError::PayloadRejected(msg) => ApiError::Internal(msg),
            SubmissionError::Cancelled => {
                ApiError::Conflict("submission cancelled before completion".to_string())
            }
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
