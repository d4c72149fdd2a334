//! Index entries: the truncated, search-oriented projection of a document.

use serde::{Deserialize, Serialize};

use docdex_store::Document;

/// Cap on indexed content length, in characters. Text beyond the cap is not
/// searchable and never appears in snippets.
pub const MAX_INDEXED_CHARS: usize = 10_000;

/// The searchable projection of one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Document id (foreign key into the store).
    pub id: String,

    /// Document title.
    pub title: String,

    /// Content, truncated to [`MAX_INDEXED_CHARS`].
    pub content: String,

    /// Flattened tag list.
    pub tags: Vec<String>,
}

impl IndexEntry {
    /// Derive an entry from a document record.
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            title: doc.title.clone(),
            content: truncate_chars(&doc.content, MAX_INDEXED_CHARS),
            tags: doc.tag_list(),
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
