//! Error types for the filesystem watcher.

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Errors that can occur in the filesystem watcher.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Directory not found.
    #[error("directory not found: {0}")]
    DirectoryNotFound(String),

    /// Path exists but is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Directory is already being watched.
    #[error("already watching: {0}")]
    AlreadyWatching(String),

    /// Notify error.
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),
}
