//! Filesystem reconciliation.
//!
//! The reconciler drives filesystem events back into the store and the
//! index. Every failure is logged and the loop continues; a single bad file
//! never stops reconciliation for the rest of the corpus.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, warn};

use docdex_extract::ContentExtractor;
use docdex_search::SearchIndex;
use docdex_store::{Document, DocumentStore, DocumentUpdate, MetadataOverrides, MetadataPatch};
use docdex_watcher::{FileEvent, FileEventKind};

/// Applies file events to the store and index.
pub(crate) struct Reconciler {
    store: Arc<RwLock<DocumentStore>>,
    index: Arc<RwLock<SearchIndex>>,
    extractor: Arc<dyn ContentExtractor>,
}

impl Reconciler {
    pub(crate) fn new(
        store: Arc<RwLock<DocumentStore>>,
        index: Arc<RwLock<SearchIndex>>,
        extractor: Arc<dyn ContentExtractor>,
    ) -> Self {
        Self {
            store,
            index,
            extractor,
        }
    }

    /// Consume events until the channel closes or shutdown is signalled.
    ///
    /// `initial` carries the startup scan; it is processed before any live
    /// event. Shutdown is only observed between events, so an in-flight
    /// reconciliation always completes.
    pub(crate) async fn run(
        self,
        events: Arc<RwLock<mpsc::Receiver<FileEvent>>>,
        initial: Vec<FileEvent>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        for event in initial {
            self.handle(event).await;
        }

        loop {
            let event = {
                let mut rx = events.write().await;
                tokio::select! {
                    event = rx.recv() => event,
                    _ = &mut shutdown_rx => None,
                }
            };

            match event {
                Some(event) => self.handle(event).await,
                None => break,
            }
        }

        debug!("Reconciler loop exited");
    }

    pub(crate) async fn handle(&self, event: FileEvent) {
        debug!("Reconciling {:?} {}", event.kind, event.path.display());

        match event.kind {
            FileEventKind::Added => self.handle_added(&event.path).await,
            FileEventKind::Changed => self.handle_changed(&event.path).await,
            FileEventKind::Removed => self.handle_removed(&event.path).await,
        }
    }

    /// A file appeared. Already-tracked paths are skipped, so startup
    /// re-announcements of known files are idempotent.
    async fn handle_added(&self, path: &Path) {
        if !self.extractor.supports(path) {
            return;
        }

        if self.store.write().await.get_document_by_path(path).is_some() {
            debug!("Already tracking {}, skipping", path.display());
            return;
        }

        let extracted = match self.extractor.extract(path).await {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!("Extraction failed for {}: {e}", path.display());
                return;
            }
        };

        let overrides = MetadataOverrides {
            extra: extracted.metadata,
            ..Default::default()
        };

        let doc = match self
            .store
            .write()
            .await
            .add_document(path, extracted.content, extracted.doc_type, overrides)
            .await
        {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Store add failed for {}: {e}", path.display());
                return;
            }
        };

        // No rollback on index failure: the store write stands and the
        // startup resync rebuild closes the gap.
        if let Err(e) = self.index.write().await.add_document(&doc).await {
            warn!("Index add failed for {}: {e}", doc.id);
        }
    }

    /// A file changed. Unknown paths heal into an add.
    async fn handle_changed(&self, path: &Path) {
        if !self.extractor.supports(path) {
            return;
        }

        let existing = self.store.write().await.get_document_by_path(path);
        let Some(existing) = existing else {
            self.handle_added(path).await;
            return;
        };

        let extracted = match self.extractor.extract(path).await {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!("Extraction failed for {}: {e}", path.display());
                return;
            }
        };

        let update = DocumentUpdate {
            content: Some(extracted.content),
            metadata: Some(MetadataPatch {
                extra: extracted.metadata,
                ..Default::default()
            }),
            ..Default::default()
        };

        let doc: Document = match self
            .store
            .write()
            .await
            .update_document(&existing.id, update)
            .await
        {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Store update failed for {}: {e}", existing.id);
                return;
            }
        };

        if let Err(e) = self.index.write().await.update_document(&doc).await {
            warn!("Index update failed for {}: {e}", doc.id);
        }
    }

    /// A file disappeared. Untracked paths are a no-op; store delete and
    /// index removal are each best-effort.
    async fn handle_removed(&self, path: &Path) {
        let existing = self.store.write().await.get_document_by_path(path);
        let Some(existing) = existing else {
            debug!("Untracked {} removed, nothing to do", path.display());
            return;
        };

        if let Err(e) = self.store.write().await.delete_document(&existing.id).await {
            warn!("Store delete failed for {}: {e}", existing.id);
        }
        if let Err(e) = self.index.write().await.remove_document(&existing.id).await {
            warn!("Index removal failed for {}: {e}", existing.id);
        }
    }
}
