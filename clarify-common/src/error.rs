//! Shared error type for the clarification services
//!
//! Covers the three failure sources the shared layer actually has:
//! the SQLite store, the filesystem, and configuration loading.
//! Service-specific errors (API responses, generation failures) live
//! in their own crates.

use thiserror::Error;

/// Result alias for clarification operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the shared layer
#[derive(Error, Debug)]
pub enum Error {
    /// Store operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),
}
