//! # Document Engine
//!
//! The engine ties docdex together: a persisted document store, a derived
//! search index and a filesystem reconciler behind one typed async surface.
//!
//! - **Operations**: add, search, get, list, update, delete, stats, resolve
//! - **Reconciler**: watcher events and a startup scan drive the store and
//!   index toward the live filesystem, log-and-continue on every failure
//! - **Envelope**: every operation can be wrapped in the uniform
//!   `{success, data?, error?}` response for a thin protocol adapter
//! - **Resources**: `docdex:<id>` URIs resolve to full document content

pub mod config;
pub mod engine;
pub mod error;
mod reconciler;
pub mod response;

pub use config::EngineConfig;
pub use engine::{
    DeleteReceipt, DocumentEngine, EngineStats, Resource, SearchResult, MAX_SEARCH_LIMIT,
};
pub use error::{EngineError, Result};
pub use response::ApiResponse;

// Re-exported so adapters only need this crate.
pub use docdex_store::{Document, DocumentSummary, DocumentType};
