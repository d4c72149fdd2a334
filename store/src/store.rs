//! Document store persistence.
//!
//! Documents are stored as one JSON file per record under `documents/`, with
//! a manifest listing all record metadata for fast startup. Both are
//! rewritten wholesale on every mutation, atomically via a temp file and
//! rename. Durable writes always precede the in-memory commit, so a failed
//! persist never leaves a phantom record behind.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};

use crate::document::{
    Document, DocumentSummary, DocumentType, DocumentUpdate, MetadataOverrides,
};
use crate::error::{Result, StoreError};

const MANIFEST_FILE: &str = "manifest.json";
const DOCUMENTS_DIR: &str = "documents";

/// Persisted store of canonical document records.
pub struct DocumentStore {
    /// Root directory for store state.
    root: PathBuf,

    /// In-memory index of records by id.
    documents: HashMap<String, Document>,
}

impl DocumentStore {
    /// Open a store at the given root, creating the on-disk layout if needed
    /// and loading all persisted records into memory.
    ///
    /// Malformed entries are dropped with a warning; load-time corruption
    /// degrades to an empty store rather than failing.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join(DOCUMENTS_DIR))
            .await
            .map_err(|e| StoreError::Persistence(format!("{}: {e}", root.display())))?;

        let mut store = Self {
            root,
            documents: HashMap::new(),
        };
        store.load_all().await;

        Ok(store)
    }

    fn slot_path(&self, id: &str) -> PathBuf {
        self.root.join(DOCUMENTS_DIR).join(format!("{id}.json"))
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Load all records, preferring the manifest for the id listing and
    /// falling back to a directory scan when it is missing or corrupt.
    async fn load_all(&mut self) {
        let ids = match self.manifest_ids().await {
            Some(ids) => ids,
            None => self.scan_slot_ids().await,
        };

        for id in ids {
            let path = self.slot_path(&id);
            match self.load_slot(&path).await {
                Ok(doc) => {
                    debug!("Loaded document {} ({})", doc.id, doc.path.display());
                    self.documents.insert(doc.id.clone(), doc);
                }
                Err(e) => {
                    warn!("Dropping malformed record {}: {e}", path.display());
                }
            }
        }

        info!("Loaded {} documents", self.documents.len());
    }

    async fn manifest_ids(&self) -> Option<Vec<String>> {
        let raw = fs::read_to_string(self.manifest_path()).await.ok()?;
        match serde_json::from_str::<Vec<DocumentSummary>>(&raw) {
            Ok(summaries) => Some(summaries.into_iter().map(|s| s.id).collect()),
            Err(e) => {
                warn!("Corrupt manifest, falling back to directory scan: {e}");
                None
            }
        }
    }

    async fn scan_slot_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        let Ok(mut entries) = fs::read_dir(self.root.join(DOCUMENTS_DIR)).await else {
            return ids;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids
    }

    async fn load_slot(&self, path: &Path) -> Result<Document> {
        let raw = fs::read_to_string(path)
            .await
            .map_err(|e| StoreError::Persistence(format!("{}: {e}", path.display())))?;
        let doc: Document = serde_json::from_str(&raw)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Write a durable slot atomically via temp file + rename.
    async fn persist_record(&self, doc: &Document) -> Result<()> {
        let path = self.slot_path(&doc.id);
        let content = serde_json::to_string_pretty(doc)?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &content)
            .await
            .map_err(|e| StoreError::Persistence(format!("{}: {e}", temp_path.display())))?;
        fs::rename(&temp_path, &path)
            .await
            .map_err(|e| StoreError::Persistence(format!("{}: {e}", path.display())))?;

        debug!("Persisted document {}", doc.id);
        Ok(())
    }

    /// Rewrite the full manifest from the in-memory index plus any staged
    /// record not yet committed to memory.
    async fn persist_manifest(&self, staged: Option<&Document>) -> Result<()> {
        let mut summaries: Vec<DocumentSummary> =
            self.documents.values().map(Document::summary).collect();
        if let Some(doc) = staged {
            summaries.retain(|s| s.id != doc.id);
            summaries.push(doc.summary());
        }
        summaries.sort_by(|a, b| a.id.cmp(&b.id));

        let path = self.manifest_path();
        let content = serde_json::to_string_pretty(&summaries)?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &content)
            .await
            .map_err(|e| StoreError::Persistence(format!("{}: {e}", temp_path.display())))?;
        fs::rename(&temp_path, &path)
            .await
            .map_err(|e| StoreError::Persistence(format!("{}: {e}", path.display())))?;

        Ok(())
    }

    /// Create and persist a new document.
    ///
    /// Fails with [`StoreError::PathExists`] when a live document already
    /// occupies the path: path uniqueness is an enforced store invariant.
    pub async fn add_document(
        &mut self,
        path: impl Into<PathBuf>,
        content: impl Into<String>,
        doc_type: DocumentType,
        overrides: MetadataOverrides,
    ) -> Result<Document> {
        let path = path.into();

        // Same self-healing as get_document: a stale record whose durable
        // slot has vanished is evicted rather than blocking the add.
        if let Some(existing_id) = self
            .documents
            .values()
            .find(|d| d.path == path)
            .map(|d| d.id.clone())
        {
            if self.slot_path(&existing_id).exists() {
                return Err(StoreError::PathExists(path.display().to_string()));
            }
            warn!("Durable slot missing for {existing_id}, evicting");
            self.documents.remove(&existing_id);
        }

        let doc = Document::new(path, content, doc_type, overrides);

        self.persist_record(&doc).await?;
        self.persist_manifest(Some(&doc)).await?;
        self.documents.insert(doc.id.clone(), doc.clone());

        info!("Added document {} ({})", doc.id, doc.path.display());
        Ok(doc)
    }

    /// Get a document by id.
    ///
    /// Self-healing: a record present in memory whose durable slot has gone
    /// missing (external deletion) is evicted and reported as not found.
    pub fn get_document(&mut self, id: &str) -> Result<Document> {
        match self.documents.get(id) {
            Some(doc) if self.slot_path(id).exists() => Ok(doc.clone()),
            Some(_) => {
                warn!("Durable slot missing for {id}, evicting");
                self.documents.remove(id);
                Err(StoreError::NotFound(id.to_string()))
            }
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    /// Get the first document whose path matches, with the same self-healing
    /// eviction as [`DocumentStore::get_document`].
    pub fn get_document_by_path(&mut self, path: &Path) -> Option<Document> {
        let id = self
            .documents
            .values()
            .find(|d| d.path == path)
            .map(|d| d.id.clone())?;
        self.get_document(&id).ok()
    }

    /// Apply a partial update to an existing document.
    pub async fn update_document(&mut self, id: &str, update: DocumentUpdate) -> Result<Document> {
        let Some(existing) = self.documents.get(id) else {
            return Err(StoreError::NotFound(id.to_string()));
        };

        let mut updated = existing.clone();
        updated.apply(update);

        self.persist_record(&updated).await?;
        self.persist_manifest(Some(&updated)).await?;
        self.documents.insert(id.to_string(), updated.clone());

        debug!("Updated document {id}");
        Ok(updated)
    }

    /// Delete a document.
    ///
    /// Slot removal is best-effort: an orphaned file is acceptable and only
    /// logged. The in-memory entry and the manifest listing always go.
    pub async fn delete_document(&mut self, id: &str) -> Result<()> {
        if !self.documents.contains_key(id) {
            return Err(StoreError::NotFound(id.to_string()));
        }

        let slot = self.slot_path(id);
        if let Err(e) = fs::remove_file(&slot).await {
            warn!("Failed to remove durable slot {}: {e}", slot.display());
        }

        self.documents.remove(id);
        self.persist_manifest(None).await?;

        info!("Deleted document {id}");
        Ok(())
    }

    /// All documents, content included.
    pub fn all_documents(&self) -> Vec<Document> {
        self.documents.values().cloned().collect()
    }

    /// All documents as lighter summaries.
    pub fn summaries(&self) -> Vec<DocumentSummary> {
        self.documents.values().map(Document::summary).collect()
    }

    /// Documents of a given type.
    pub fn documents_by_type(&self, doc_type: DocumentType) -> Vec<Document> {
        self.documents
            .values()
            .filter(|d| d.doc_type == doc_type)
            .cloned()
            .collect()
    }

    /// Documents carrying any of the given tags.
    pub fn documents_by_tags(&self, tags: &[&str]) -> Vec<Document> {
        self.documents
            .values()
            .filter(|d| {
                d.metadata
                    .tags
                    .as_deref()
                    .is_some_and(|doc_tags| tags.iter().any(|t| doc_tags.iter().any(|dt| dt == t)))
            })
            .cloned()
            .collect()
    }

    /// Synchronous stats over the in-memory index. No I/O.
    pub fn stats(&self) -> StoreStats {
        let mut by_type: HashMap<String, usize> = HashMap::new();
        let mut total_size_bytes: u64 = 0;

        for doc in self.documents.values() {
            *by_type.entry(doc.doc_type.as_str().to_string()).or_insert(0) += 1;
            total_size_bytes += doc.metadata.size;
        }

        StoreStats {
            document_count: self.documents.len(),
            by_type,
            total_size_bytes,
        }
    }
}

/// Statistics about the document store.
#[derive(Debug, Clone)]
pub struct StoreStats {
    /// Number of live documents.
    pub document_count: usize,

    /// Histogram of documents per type.
    pub by_type: HashMap<String, usize>,

    /// Sum of content byte sizes.
    pub total_size_bytes: u64,
}
