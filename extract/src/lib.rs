//! # Content Extraction
//!
//! This crate turns raw files into document payloads for docdex. The
//! [`ContentExtractor`] trait is the seam the engine calls through, so
//! format-specific extraction stays replaceable; [`BasicExtractor`] is the
//! built-in implementation covering the closed set of supported formats
//! (plain text, Markdown, HTML, JSON, CSV).
//!
//! Extractors must reject unsupported extensions before touching the file
//! and must prefer degraded extraction (partial text) over failure on
//! malformed-but-readable input.

pub mod basic;
pub mod error;

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;

use docdex_store::DocumentType;

pub use basic::BasicExtractor;
pub use error::{ExtractError, Result};

/// The output of a successful extraction.
#[derive(Debug, Clone)]
pub struct Extracted {
    /// Extracted text content.
    pub content: String,

    /// Resolved document format.
    pub doc_type: DocumentType,

    /// Format-specific metadata (headings, frontmatter, row counts, ...).
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Converts a raw file into text plus metadata for a known format.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Lowercase file extensions this extractor accepts.
    fn supported_extensions(&self) -> &[&'static str];

    /// Whether the path's extension is in the supported set.
    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .is_some_and(|ext| self.supported_extensions().contains(&ext.as_str()))
    }

    /// Extract content and metadata from the file at `path`.
    async fn extract(&self, path: &Path) -> Result<Extracted>;
}
