//! Common error types for AccrediFy

use thiserror::Error;

/// Common result type for AccrediFy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across AccrediFy crates
#[derive(Error, Debug)]
pub enum Error {
    /// Storage/transaction failure (wraps sqlx::Error)
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

    /// Invalid input (missing rejection reason, malformed request field)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation not permitted in the current state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal error (corrupt stored value, broken invariant)
    #[error("Internal error: {0}")]
    Internal(String),
}
