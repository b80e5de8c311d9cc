//! Common error types for the i7card tools

use thiserror::Error;

/// Common result type for i7card operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the i7card binaries
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Source fetch failure; fatal to an import pass
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Source text is not usable CSV; fatal to an import pass
    #[error("Malformed source: {0}")]
    Malformed(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
