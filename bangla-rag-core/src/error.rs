//! Error types for bangla-rag

use thiserror::Error;

/// The main error type for bangla-rag operations
#[derive(Error, Debug)]
pub enum Error {
    /// The referenced session is not present in the store
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Internal store invariant violation
    #[error("Store error: {0}")]
    Store(String),

    /// Disk read/write failure of the session document
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// The retrieval and generation collaborator failed
    #[error("Retrieval error: {0}")]
    Retrieval(String),
}

/// A specialized Result type for bangla-rag operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(e: tempfile::PersistError) -> Self {
        Error::Persistence(e.to_string())
    }
}
