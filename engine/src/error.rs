//! Engine-level errors.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the document engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Document store error.
    #[error("store error: {0}")]
    Store(#[from] docdex_store::StoreError),

    /// Search index error.
    #[error("index error: {0}")]
    Index(#[from] docdex_search::IndexError),

    /// Content extraction error.
    #[error("extraction error: {0}")]
    Extract(#[from] docdex_extract::ExtractError),

    /// Filesystem watcher error.
    #[error("watcher error: {0}")]
    Watcher(#[from] docdex_watcher::WatcherError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unresolvable resource URI.
    #[error("invalid resource uri: {0}")]
    InvalidResource(String),
}
