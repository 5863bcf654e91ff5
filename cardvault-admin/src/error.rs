//! Error types for cardvault-admin

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Field-level validation failure (400)
    #[error("Validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    /// Conflict (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Not enough copies for a move or remove (422)
    #[error("{0}")]
    InsufficientQuantity(String),

    /// External card-data source failed (502)
    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<cardvault_common::Error> for ApiError {
    fn from(err: cardvault_common::Error) -> Self {
        use cardvault_common::Error as E;
        match err {
            E::NotFound(msg) => ApiError::NotFound(msg),
            E::InvalidInput(msg) => ApiError::BadRequest(msg),
            E::Validation { field, message } => ApiError::Validation { field, message },
            E::InsufficientQuantity(msg) => ApiError::InsufficientQuantity(msg),
            E::Upstream(msg) => ApiError::Upstream(msg),
            // a concurrent writer won a unique-key race
            E::Database(e)
                if e
                    .as_database_error()
                    .map(|d| d.is_unique_violation())
                    .unwrap_or(false) =>
            {
                ApiError::Conflict("The record was changed by another request".to_string())
            }
            E::Database(e) => ApiError::Internal(format!("database: {}", e)),
            E::Io(e) => ApiError::Internal(format!("io: {}", e)),
            E::Config(msg) => ApiError::Internal(format!("config: {}", msg)),
            E::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, field) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            ApiError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                message,
                Some(field),
            ),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg, None),
            ApiError::InsufficientQuantity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INSUFFICIENT_QUANTITY",
                msg,
                None,
            ),
            ApiError::Upstream(msg) => (
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_UNAVAILABLE",
                msg,
                None,
            ),
            // detail goes to the log, the caller gets a generic message
            ApiError::Internal(detail) => {
                error!(error = %detail, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "The operation failed and no changes were saved".to_string(),
                    None,
                )
            }
            ApiError::Other(ref err) => {
                error!(error = %err, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "The operation failed and no changes were saved".to_string(),
                    None,
                )
            }
        };

        let mut error = json!({
            "code": error_code,
            "message": message,
        });
        if let Some(field) = field {
            error["field"] = json!(field);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
