//! Core document types and operations.
//!
//! A document is a canonical, persisted record of extracted text plus
//! metadata for one source file. Ids are assigned once at creation and never
//! change; the source path is likewise immutable for the life of the record.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, StoreError};

/// Supported document formats.
///
/// This is a closed enumeration: the content extractor maps file extensions
/// onto exactly these variants, and anything outside the set is rejected
/// before extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Plain text.
    Text,
    /// Markdown, optionally with YAML frontmatter.
    Markdown,
    /// HTML; tags are stripped at extraction time.
    Html,
    /// JSON data files.
    Json,
    /// Comma-separated values.
    Csv,
}

impl DocumentType {
    /// Stable lowercase name, used in stats histograms and responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A canonical document record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier, assigned once at creation.
    pub id: String,

    /// Display title; defaults to the file name.
    pub title: String,

    /// Full extracted text.
    pub content: String,

    /// Absolute path of the source file. At most one live document per path.
    pub path: PathBuf,

    /// Format of the source file.
    #[serde(rename = "type")]
    pub doc_type: DocumentType,

    /// Structured metadata.
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Create a new document from extracted content.
    ///
    /// Derived fields (size, word count, char count) are computed from
    /// `content`; `created_at` and `updated_at` start out equal.
    pub fn new(
        path: impl Into<PathBuf>,
        content: impl Into<String>,
        doc_type: DocumentType,
        overrides: MetadataOverrides,
    ) -> Self {
        let path = path.into();
        let content = content.into();
        let now = Utc::now();

        let title = overrides.title.unwrap_or_else(|| default_title(&path));

        Self {
            id: Uuid::new_v4().to_string(),
            title,
            path,
            doc_type,
            metadata: DocumentMetadata {
                created_at: now,
                updated_at: now,
                size: content.len() as u64,
                word_count: word_count(&content),
                char_count: content.chars().count(),
                tags: overrides.tags,
                summary: overrides.summary,
                extra: overrides.extra,
            },
            content,
        }
    }

    /// Apply a partial update in place.
    ///
    /// Top-level fields are shallow-merged, metadata is deep-merged and
    /// `updated_at` is always refreshed. Derived counts are recomputed when
    /// the content changes. `id` and `path` are immutable.
    pub fn apply(&mut self, update: DocumentUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }

        if let Some(content) = update.content {
            self.metadata.size = content.len() as u64;
            self.metadata.word_count = word_count(&content);
            self.metadata.char_count = content.chars().count();
            self.content = content;
        }

        if let Some(meta) = update.metadata {
            if let Some(tags) = meta.tags {
                self.metadata.tags = Some(tags);
            }
            if let Some(summary) = meta.summary {
                self.metadata.summary = Some(summary);
            }
            for (key, value) in meta.extra {
                self.metadata.extra.insert(key, value);
            }
        }

        self.metadata.updated_at = Utc::now();
    }

    /// Validate a record loaded from disk.
    ///
    /// Persisted entries must carry a non-empty id, title, content and path;
    /// timestamps and the size field are enforced by the typed parse.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(StoreError::Validation("empty id".to_string()));
        }
        if self.title.is_empty() {
            return Err(StoreError::Validation(format!("{}: empty title", self.id)));
        }
        if self.content.is_empty() {
            return Err(StoreError::Validation(format!(
                "{}: empty content",
                self.id
            )));
        }
        if self.path.as_os_str().is_empty() {
            return Err(StoreError::Validation(format!("{}: empty path", self.id)));
        }
        Ok(())
    }

    /// Lighter projection omitting the content body.
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            path: self.path.clone(),
            doc_type: self.doc_type,
            metadata: self.metadata.clone(),
        }
    }

    /// Tags, flattened to an owned list (empty when unset).
    pub fn tag_list(&self) -> Vec<String> {
        self.metadata.tags.clone().unwrap_or_default()
    }
}

/// Structured metadata attached to every document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// When the document was created.
    pub created_at: DateTime<Utc>,

    /// When the document was last mutated.
    pub updated_at: DateTime<Utc>,

    /// Byte length of the content.
    pub size: u64,

    /// Whitespace-delimited non-empty tokens in the content.
    pub word_count: usize,

    /// Unicode scalar count of the content.
    pub char_count: usize,

    /// Ordered tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    /// Optional short summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Open extension map for format-specific fields (headings, frontmatter,
    /// row counts, ...).
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A document without its content body, as listed by the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Document id.
    pub id: String,

    /// Display title.
    pub title: String,

    /// Absolute source path.
    pub path: PathBuf,

    /// Format of the source file.
    #[serde(rename = "type")]
    pub doc_type: DocumentType,

    /// Structured metadata.
    pub metadata: DocumentMetadata,
}

/// Optional metadata supplied at creation time.
#[derive(Debug, Clone, Default)]
pub struct MetadataOverrides {
    /// Title override; the file name is used when absent.
    pub title: Option<String>,

    /// Initial tags.
    pub tags: Option<Vec<String>>,

    /// Initial summary.
    pub summary: Option<String>,

    /// Format-specific extension fields.
    pub extra: HashMap<String, serde_json::Value>,
}

/// A partial update to an existing document.
#[derive(Debug, Clone, Default)]
pub struct DocumentUpdate {
    /// New title.
    pub title: Option<String>,

    /// New content; derived counts are recomputed.
    pub content: Option<String>,

    /// Metadata patch, deep-merged into the existing block.
    pub metadata: Option<MetadataPatch>,
}

/// Deep-merge patch for the metadata block.
#[derive(Debug, Clone, Default)]
pub struct MetadataPatch {
    /// Replacement tag list.
    pub tags: Option<Vec<String>>,

    /// Replacement summary.
    pub summary: Option<String>,

    /// Extension fields; keys overlay existing ones.
    pub extra: HashMap<String, serde_json::Value>,
}

/// Count whitespace-delimited non-empty tokens.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn default_title(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
