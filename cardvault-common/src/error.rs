//! Common error types for CardVault

use thiserror::Error;

/// Common result type for CardVault operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across CardVault crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Field-level validation failure
    #[error("Validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    /// Not enough copies at a location for the requested move/remove
    #[error("Insufficient quantity: {0}")]
    InsufficientQuantity(String),

    /// External card-data source unreachable or returned a failure
    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a field-level validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}
