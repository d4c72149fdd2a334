//! # Document Store
//!
//! This crate owns the canonical document records for docdex and their
//! persisted representation. It provides:
//!
//! - **Document model**: extracted text plus metadata for one source file
//! - **Durable slots**: one JSON file per document, rewritten atomically
//! - **Manifest**: a persisted listing of all document metadata used to
//!   repopulate the in-memory index at startup
//! - **Read projections**: summaries, per-type and per-tag views, stats
//!
//! The store is the single source of truth for content and metadata. The
//! search index and the filesystem reconciler only ever mutate documents
//! through its contract.

pub mod document;
pub mod error;
pub mod store;

pub use document::{
    Document, DocumentMetadata, DocumentSummary, DocumentType, DocumentUpdate, MetadataOverrides,
    MetadataPatch,
};
pub use error::{Result, StoreError};
pub use store::{DocumentStore, StoreStats};
