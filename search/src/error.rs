//! Error types for the search index.

use thiserror::Error;

/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors that can occur in the search index.
#[derive(Error, Debug)]
pub enum IndexError {
    /// No index entry for the given document id.
    #[error("index entry not found: {0}")]
    NotFound(String),

    /// Persisting or loading the index artifact failed.
    #[error("index persistence error: {0}")]
    Persistence(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
