//! # Search Index
//!
//! This crate owns the derived, searchable projection of the document store:
//!
//! - **Index entries**: truncated per-document projections (id, title,
//!   capped content, tags)
//! - **Inverted index**: a serializable term index with per-field weighting
//!   (title above tags above raw content) and BM25-style relevance
//! - **Query normalization**: sanitized terms with prefix expansion for
//!   single-word queries
//! - **Snippets**: a window around the earliest literal query match
//!
//! The index structure is immutable once built: any membership change
//! triggers a full rebuild from the current entries, a deliberate
//! correctness-over-efficiency choice for a local, human-scale collection.

pub mod entry;
pub mod error;
pub mod index;
pub mod query;
pub mod snippet;

pub use entry::{IndexEntry, MAX_INDEXED_CHARS};
pub use error::{IndexError, Result};
pub use index::{IndexStats, SearchHit, SearchIndex};
pub use query::{normalize_query, QueryTerm};
