//! Common error types for the RNC register

use thiserror::Error;

use crate::lifecycle::TransitionError;

/// Common result type for RNC operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the library and the server
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

    /// Requested record, attachment or project code not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or invalid user input (e.g. blank closing description)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Status change not allowed from the record's current state
    #[error("Invalid transition: {0}")]
    InvalidTransition(#[from] TransitionError),

    /// Bulk import rejected; nothing was written
    #[error("Import failed: {0}")]
    Import(String),

    /// Internal fault (e.g. duplicate generated identifier)
    #[error("Internal error: {0}")]
    Internal(String),
}
