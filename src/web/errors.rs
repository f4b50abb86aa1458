//! # Web API Error Types
//!
//! HTTP-facing errors and their conversions from the engine's internal
//! error types. Every response body shares one JSON shape:
//!
//! ```json
//! {"error": {"code": "NOT_FOUND", "message": "Job not found: ..."}}
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::aggregate::StitchError;
use crate::store::StoreError;

/// Web API specific errors with HTTP status code mappings.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Resource not found: {message}")]
    NotFound { message: String },

    #[error("Invalid request: {message}")]
    BadRequest { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Internal server error")]
    Internal,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::JobNotFound { job_id } => {
                Self::not_found(format!("Job not found: {job_id}"))
            }
            StoreError::IllegalTransition { job_id, from, to } => {
                Self::conflict(format!("Job {job_id} cannot move from {from} to {to}"))
            }
            other => {
                error!(error = %other, "Job store failure");
                Self::Internal
            }
        }
    }
}

impl From<StitchError> for ApiError {
    fn from(error: StitchError) -> Self {
        match error {
            StitchError::Store(inner) => inner.into(),
            other => {
                error!(error = %other, "Stitch failure");
                Self::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_code, message) = match &self {
            ApiError::NotFound { message } => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", message.as_str())
            }
            ApiError::BadRequest { message } => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", message.as_str())
            }
            ApiError::Conflict { message } => (StatusCode::CONFLICT, "CONFLICT", message.as_str()),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error",
            ),
        };

        let body = json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        });
        (status_code, Json(body)).into_response()
    }
}
