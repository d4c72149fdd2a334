//! The document engine facade.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use docdex_extract::{BasicExtractor, ContentExtractor};
use docdex_search::SearchIndex;
use docdex_store::{
    Document, DocumentStore, DocumentSummary, DocumentType, DocumentUpdate, MetadataOverrides,
    MetadataPatch,
};
use docdex_watcher::{scan_directory, DirectoryWatcher, WatchConfig};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::reconciler::Reconciler;

/// Maximum number of search results returned per query.
pub const MAX_SEARCH_LIMIT: usize = 50;

const RESOURCE_SCHEME: &str = "docdex:";

/// The engine: document store, search index and reconciler behind one
/// typed async surface.
///
/// Store and index each sit behind a write lock, so every mutation is a
/// critical section with respect to both direct calls and watcher-driven
/// reconciliation.
pub struct DocumentEngine {
    config: EngineConfig,
    store: Arc<RwLock<DocumentStore>>,
    index: Arc<RwLock<SearchIndex>>,
    extractor: Arc<dyn ContentExtractor>,
    watcher: DirectoryWatcher,
    reconciler_task: Option<JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl DocumentEngine {
    /// Open an engine over the configured data root.
    ///
    /// The search index is resynchronized from the store at startup, which
    /// repairs any divergence a previous crash or failed persist left
    /// behind.
    pub async fn open(config: EngineConfig) -> Result<Self> {
        let store = DocumentStore::open(config.store_root()).await?;
        let mut index =
            SearchIndex::open(config.index_root()).await?.with_snippet_width(config.snippet_width);

        let documents = store.all_documents();
        index.rebuild_from_documents(&documents).await?;

        info!(
            "Engine opened at {} with {} documents",
            config.data_root.display(),
            documents.len()
        );

        Ok(Self {
            config,
            store: Arc::new(RwLock::new(store)),
            index: Arc::new(RwLock::new(index)),
            extractor: Arc::new(BasicExtractor::new()),
            watcher: DirectoryWatcher::new(),
            reconciler_task: None,
            shutdown_tx: None,
        })
    }

    /// Ingest a file: extract its content and register it in the store and
    /// the index.
    pub async fn add(
        &self,
        path: impl AsRef<Path>,
        tags: Option<Vec<String>>,
        title: Option<String>,
    ) -> Result<Document> {
        let path = path.as_ref();
        let extracted = self.extractor.extract(path).await?;

        let overrides = MetadataOverrides {
            title,
            tags,
            summary: None,
            extra: extracted.metadata,
        };

        let doc = self
            .store
            .write()
            .await
            .add_document(path, extracted.content, extracted.doc_type, overrides)
            .await?;

        if let Err(e) = self.index.write().await.add_document(&doc).await {
            warn!("Document {} stored but not indexed: {e}", doc.id);
        }

        Ok(doc)
    }

    /// Ranked search, with hits enriched from store metadata.
    ///
    /// `limit` is capped at [`MAX_SEARCH_LIMIT`].
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let limit = limit.min(MAX_SEARCH_LIMIT);
        let hits = self.index.read().await.search(query, limit);

        let summaries: HashMap<String, DocumentSummary> = {
            let store = self.store.read().await;
            store.summaries().into_iter().map(|s| (s.id.clone(), s)).collect()
        };

        let results = hits
            .into_iter()
            .filter_map(|hit| {
                let Some(summary) = summaries.get(&hit.id) else {
                    debug!("Dropping hit for unknown document {}", hit.id);
                    return None;
                };
                Some(SearchResult {
                    id: hit.id,
                    title: hit.title,
                    score: hit.score,
                    snippet: hit.snippet,
                    path: summary.path.clone(),
                    doc_type: summary.doc_type,
                    tags: summary.metadata.tags.clone().unwrap_or_default(),
                    updated_at: summary.metadata.updated_at,
                })
            })
            .collect();

        Ok(results)
    }

    /// Get a document by id.
    pub async fn get(&self, id: &str) -> Result<Document> {
        Ok(self.store.write().await.get_document(id)?)
    }

    /// List all documents as summaries, most recently updated first.
    pub async fn list(&self) -> Result<Vec<DocumentSummary>> {
        let mut summaries = self.store.read().await.summaries();
        summaries.sort_by(|a, b| b.metadata.updated_at.cmp(&a.metadata.updated_at));
        Ok(summaries)
    }

    /// Update a document's title and/or tags, then reindex it.
    pub async fn update(
        &self,
        id: &str,
        title: Option<String>,
        tags: Option<Vec<String>>,
    ) -> Result<Document> {
        let update = DocumentUpdate {
            title,
            content: None,
            metadata: tags.map(|tags| MetadataPatch {
                tags: Some(tags),
                ..Default::default()
            }),
        };

        let doc = self.store.write().await.update_document(id, update).await?;
        self.index.write().await.update_document(&doc).await?;
        Ok(doc)
    }

    /// Delete a document from the store and the index.
    pub async fn delete(&self, id: &str) -> Result<DeleteReceipt> {
        self.store.write().await.delete_document(id).await?;

        if let Err(e) = self.index.write().await.remove_document(id).await {
            warn!("Document {id} deleted but index removal failed: {e}");
        }

        Ok(DeleteReceipt {
            id: id.to_string(),
            deleted: true,
        })
    }

    /// Combined store and index statistics.
    pub async fn stats(&self) -> Result<EngineStats> {
        let store_stats = self.store.read().await.stats();
        let index_stats = self.index.read().await.stats();

        Ok(EngineStats {
            document_count: store_stats.document_count,
            by_type: store_stats.by_type,
            total_size_bytes: store_stats.total_size_bytes,
            indexed_count: index_stats.entry_count,
            index_exists: index_stats.index_exists,
            index_size_bytes: index_stats.index_size_bytes,
        })
    }

    /// Resolve a `docdex:<id>` resource URI to the full document content
    /// plus header metadata.
    pub async fn resolve(&self, uri: &str) -> Result<Resource> {
        let id = uri
            .strip_prefix(RESOURCE_SCHEME)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| EngineError::InvalidResource(uri.to_string()))?;

        let doc = self.get(id).await?;
        Ok(Resource {
            uri: uri.to_string(),
            title: doc.title,
            path: doc.path,
            doc_type: doc.doc_type,
            tags: doc.metadata.tags.unwrap_or_default(),
            updated_at: doc.metadata.updated_at,
            content: doc.content,
        })
    }

    /// Start the reconciler: register watch roots, scan their current
    /// contents and spawn the event loop.
    ///
    /// A no-op when no watch directories are configured. Watch roots that
    /// do not exist are skipped with a warning rather than failing startup.
    pub async fn start(&mut self) -> Result<()> {
        if self.config.watch_dirs.is_empty() {
            debug!("No watch directories configured");
            return Ok(());
        }
        if self.reconciler_task.is_some() {
            return Ok(());
        }

        let mut initial = Vec::new();
        for dir in &self.config.watch_dirs {
            let watch_config = WatchConfig::new(dir).with_debounce(self.config.debounce);

            match scan_directory(&watch_config) {
                Ok(events) => initial.extend(events),
                Err(e) => {
                    warn!("Skipping watch root {}: {e}", dir.display());
                    continue;
                }
            }

            if let Err(e) = self.watcher.add(watch_config).await {
                warn!("Skipping watch root {}: {e}", dir.display());
            }
        }

        self.watcher.start().await?;

        let reconciler = Reconciler::new(
            self.store.clone(),
            self.index.clone(),
            self.extractor.clone(),
        );
        let events = self.watcher.events().clone();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        self.shutdown_tx = Some(shutdown_tx);
        self.reconciler_task = Some(tokio::spawn(async move {
            reconciler.run(events, initial, shutdown_rx).await;
        }));

        info!("Reconciler started");
        Ok(())
    }

    /// Stop the reconciler.
    ///
    /// Watches are torn down without flushing pending debounced events; a
    /// reconciliation already in flight completes before the loop exits.
    pub async fn stop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        self.watcher.stop().await;

        if let Some(task) = self.reconciler_task.take() {
            let _ = task.await;
        }

        info!("Reconciler stopped");
    }

    /// Whether the reconciler is running.
    pub fn is_watching(&self) -> bool {
        self.reconciler_task.is_some()
    }
}

/// A search hit enriched with store metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Document id.
    pub id: String,

    /// Document title.
    pub title: String,

    /// Relevance score.
    pub score: f32,

    /// Window around the earliest query match.
    pub snippet: String,

    /// Source path.
    pub path: PathBuf,

    /// Document format.
    #[serde(rename = "type")]
    pub doc_type: DocumentType,

    /// Tags (empty when unset).
    pub tags: Vec<String>,

    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

/// Acknowledgement of a completed delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteReceipt {
    /// Id of the deleted document.
    pub id: String,

    /// Always true on success.
    pub deleted: bool,
}

/// Combined store and index statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    /// Number of live documents in the store.
    pub document_count: usize,

    /// Histogram of documents per type.
    pub by_type: HashMap<String, usize>,

    /// Sum of content byte sizes.
    pub total_size_bytes: u64,

    /// Number of index entries.
    pub indexed_count: usize,

    /// Whether a built index currently exists.
    pub index_exists: bool,

    /// Size of the persisted index artifact.
    pub index_size_bytes: u64,
}

/// A resolved `docdex:` resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// The URI this resource was resolved from.
    pub uri: String,

    /// Document title.
    pub title: String,

    /// Source path.
    pub path: PathBuf,

    /// Document format.
    #[serde(rename = "type")]
    pub doc_type: DocumentType,

    /// Tags (empty when unset).
    pub tags: Vec<String>,

    /// Last mutation time.
    pub updated_at: DateTime<Utc>,

    /// Full document content.
    pub content: String,
}
