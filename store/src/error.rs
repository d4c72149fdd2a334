//! Error types for the document store.

use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in the document store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Document not found by id or path.
    #[error("document not found: {0}")]
    NotFound(String),

    /// A live document already exists at this path.
    #[error("document already exists for path: {0}")]
    PathExists(String),

    /// Persisted record failed validation.
    #[error("invalid document record: {0}")]
    Validation(String),

    /// Durable write or read failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
