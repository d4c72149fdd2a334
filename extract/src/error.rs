//! Error types for content extraction.

use thiserror::Error;

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Errors that can occur during content extraction.
///
/// Every error is attributable to a single file; a failed extraction never
/// takes the processing of other files down with it.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// File extension is not in the supported set.
    #[error("unsupported extension: {0}")]
    UnsupportedExtension(String),

    /// Reading the source file failed.
    #[error("failed to read file: {0}")]
    Read(String),
}
