//! The search index: entries, the inverted term index, and queries.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

use docdex_store::Document;

use crate::entry::IndexEntry;
use crate::error::{IndexError, Result};
use crate::query::{normalize_query, QueryTerm};
use crate::snippet::{extract_snippet, DEFAULT_SNIPPET_WIDTH};

const INDEX_FILE: &str = "search_index.json";

/// Per-field weights: title above tags above raw content.
const W_TITLE: f32 = 3.0;
const W_TAGS: f32 = 2.0;
const W_CONTENT: f32 = 1.0;

const BM25_K1: f32 = 1.2;
const BM25_B: f32 = 0.75;

/// Discount applied to prefix (wildcard) matches relative to exact ones.
const PREFIX_WEIGHT: f32 = 0.85;

/// Term frequencies per field for one document.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct FieldFreq {
    title: u32,
    tags: u32,
    content: u32,
}

/// The inverted term index, rebuilt wholesale on every membership change and
/// treated as immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TextIndex {
    /// term -> document id -> per-field frequencies.
    postings: HashMap<String, HashMap<String, FieldFreq>>,

    /// Content token count per document, for length normalization.
    doc_lengths: HashMap<String, u32>,

    /// Number of indexed documents.
    total_docs: usize,

    /// Mean content token count.
    avg_doc_len: f32,
}

impl TextIndex {
    fn build(entries: &HashMap<String, IndexEntry>) -> Self {
        let mut postings: HashMap<String, HashMap<String, FieldFreq>> = HashMap::new();
        let mut doc_lengths = HashMap::new();

        for entry in entries.values() {
            for token in tokenize(&entry.title) {
                postings
                    .entry(token)
                    .or_default()
                    .entry(entry.id.clone())
                    .or_default()
                    .title += 1;
            }
            for tag in &entry.tags {
                for token in tokenize(tag) {
                    postings
                        .entry(token)
                        .or_default()
                        .entry(entry.id.clone())
                        .or_default()
                        .tags += 1;
                }
            }
            let content_tokens = tokenize(&entry.content);
            doc_lengths.insert(entry.id.clone(), content_tokens.len() as u32);
            for token in content_tokens {
                postings
                    .entry(token)
                    .or_default()
                    .entry(entry.id.clone())
                    .or_default()
                    .content += 1;
            }
        }

        let total_docs = entries.len();
        let avg_doc_len = if total_docs == 0 {
            1.0
        } else {
            (doc_lengths.values().map(|l| *l as f32).sum::<f32>() / total_docs as f32).max(1.0)
        };

        Self {
            postings,
            doc_lengths,
            total_docs,
            avg_doc_len,
        }
    }

    /// Accumulate relevance scores per document for the given terms.
    fn score(&self, terms: &[QueryTerm]) -> HashMap<String, f32> {
        let mut scores: HashMap<String, f32> = HashMap::new();

        for term in terms {
            match term {
                QueryTerm::Exact(word) => {
                    if let Some(docs) = self.postings.get(word) {
                        self.accumulate(docs, 1.0, &mut scores);
                    }
                }
                QueryTerm::Prefix(stem) => {
                    for (token, docs) in &self.postings {
                        if token != stem && token.starts_with(stem.as_str()) {
                            self.accumulate(docs, PREFIX_WEIGHT, &mut scores);
                        }
                    }
                }
            }
        }

        scores
    }

    fn accumulate(
        &self,
        docs: &HashMap<String, FieldFreq>,
        weight: f32,
        scores: &mut HashMap<String, f32>,
    ) {
        let df = docs.len() as f32;
        let n = self.total_docs as f32;
        let idf = ((n - df + 0.5) / (df + 0.5)).ln_1p().max(0.0);

        for (id, freq) in docs {
            let doc_len = self.doc_lengths.get(id).copied().unwrap_or(0) as f32;
            let content_norm = BM25_B.mul_add(doc_len / self.avg_doc_len, 1.0 - BM25_B);

            let field_score = W_TITLE * saturate(freq.title as f32, 1.0)
                + W_TAGS * saturate(freq.tags as f32, 1.0)
                + W_CONTENT * saturate(freq.content as f32, content_norm);

            *scores.entry(id.clone()).or_insert(0.0) += weight * idf * field_score;
        }
    }
}

/// BM25 term-frequency saturation.
fn saturate(tf: f32, norm: f32) -> f32 {
    if tf == 0.0 {
        return 0.0;
    }
    tf * (BM25_K1 + 1.0) / (BM25_K1 * norm + tf)
}

/// Split text into lowercase tokens on anything outside word, hyphen and
/// underscore characters.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// A single search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Document id.
    pub id: String,

    /// Document title.
    pub title: String,

    /// Relevance score (higher is better).
    pub score: f32,

    /// Window around the earliest literal query match.
    pub snippet: String,
}

/// Statistics about the search index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of index entries.
    pub entry_count: usize,

    /// Whether a built index currently exists.
    pub index_exists: bool,

    /// Size of the persisted index artifact, in bytes.
    pub index_size_bytes: u64,
}

/// On-disk shape of the index artifact. `index: null` is the persisted
/// no-index state.
#[derive(Serialize, Deserialize)]
struct PersistedIndex {
    entries: Vec<IndexEntry>,
    index: Option<TextIndex>,
}

/// The search index over document projections.
pub struct SearchIndex {
    /// Root directory for the persisted artifact.
    root: PathBuf,

    /// Entries by document id.
    entries: HashMap<String, IndexEntry>,

    /// The built index; `None` when the corpus is empty.
    index: Option<TextIndex>,

    /// Snippet window width.
    snippet_width: usize,
}

impl SearchIndex {
    /// Open an index at the given root, loading the persisted artifact.
    ///
    /// A missing or corrupt artifact degrades to an empty index rather than
    /// failing; the engine's startup resync rebuild recovers the state.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(&root)
            .await
            .map_err(|e| IndexError::Persistence(format!("{}: {e}", root.display())))?;

        let mut index = Self {
            root,
            entries: HashMap::new(),
            index: None,
            snippet_width: DEFAULT_SNIPPET_WIDTH,
        };
        index.load().await;

        Ok(index)
    }

    /// Override the snippet window width.
    pub fn with_snippet_width(mut self, width: usize) -> Self {
        self.snippet_width = width;
        self
    }

    fn artifact_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    async fn load(&mut self) {
        let path = self.artifact_path();
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(_) => {
                debug!("No persisted index at {}", path.display());
                return;
            }
        };

        match serde_json::from_str::<PersistedIndex>(&raw) {
            Ok(persisted) => {
                self.entries = persisted
                    .entries
                    .into_iter()
                    .map(|e| (e.id.clone(), e))
                    .collect();
                self.index = persisted.index;
                info!("Loaded search index with {} entries", self.entries.len());
            }
            Err(e) => {
                warn!("Corrupt index artifact, starting empty: {e}");
            }
        }
    }

    async fn persist(&self) -> Result<()> {
        let mut entries: Vec<IndexEntry> = self.entries.values().cloned().collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));

        let persisted = PersistedIndex {
            entries,
            index: self.index.clone(),
        };
        let content = serde_json::to_string(&persisted)?;

        let path = self.artifact_path();
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &content)
            .await
            .map_err(|e| IndexError::Persistence(format!("{}: {e}", temp_path.display())))?;
        fs::rename(&temp_path, &path)
            .await
            .map_err(|e| IndexError::Persistence(format!("{}: {e}", path.display())))?;

        Ok(())
    }

    /// Rebuild the term index from all current entries. An empty corpus
    /// yields the no-index state, not an empty-but-present index.
    fn rebuild(&mut self) {
        if self.entries.is_empty() {
            self.index = None;
        } else {
            self.index = Some(TextIndex::build(&self.entries));
        }
        debug!("Rebuilt index over {} entries", self.entries.len());
    }

    /// Insert or replace the entry for a document, rebuild and persist.
    ///
    /// O(total indexed documents) per call: the index structure is immutable
    /// once built, so any membership change reconstructs it.
    pub async fn add_document(&mut self, doc: &Document) -> Result<()> {
        let entry = IndexEntry::from_document(doc);
        self.entries.insert(entry.id.clone(), entry);
        self.rebuild();
        self.persist().await
    }

    /// Same insert-or-replace semantics as [`SearchIndex::add_document`].
    pub async fn update_document(&mut self, doc: &Document) -> Result<()> {
        self.add_document(doc).await
    }

    /// Remove a document's entry, rebuild and persist.
    pub async fn remove_document(&mut self, id: &str) -> Result<()> {
        if self.entries.remove(id).is_none() {
            return Err(IndexError::NotFound(id.to_string()));
        }
        self.rebuild();
        self.persist().await
    }

    /// Clear all entries and re-derive them from a full document list, then
    /// rebuild and persist. Used to resynchronize with the store at startup.
    pub async fn rebuild_from_documents(&mut self, documents: &[Document]) -> Result<()> {
        self.entries = documents
            .iter()
            .map(|d| (d.id.clone(), IndexEntry::from_document(d)))
            .collect();
        self.rebuild();
        self.persist().await?;

        info!("Resynchronized index from {} documents", documents.len());
        Ok(())
    }

    /// Ranked search over the index.
    ///
    /// Blank queries and the no-index state return an empty result set, not
    /// an error. Results are truncated to `limit`.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let Some(index) = &self.index else {
            return Vec::new();
        };

        let terms = normalize_query(query);
        if terms.is_empty() {
            return Vec::new();
        }

        let scores = index.score(&terms);
        let words: Vec<&str> = terms.iter().map(QueryTerm::word).collect();

        let mut hits: Vec<SearchHit> = scores
            .into_iter()
            .filter_map(|(id, score)| {
                let entry = self.entries.get(&id)?;
                Some(SearchHit {
                    snippet: extract_snippet(&entry.content, &words, self.snippet_width),
                    title: entry.title.clone(),
                    id,
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        hits
    }

    /// Whether an entry exists for the given document id.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Statistics about the index. The artifact size is read from disk.
    pub fn stats(&self) -> IndexStats {
        let index_size_bytes = std::fs::metadata(self.artifact_path())
            .map(|m| m.len())
            .unwrap_or(0);

        IndexStats {
            entry_count: self.entries.len(),
            index_exists: self.index.is_some(),
            index_size_bytes,
        }
    }

    /// Drop all entries and the built index; best-effort removal of the
    /// persisted artifact.
    pub async fn clear(&mut self) {
        self.entries.clear();
        self.index = None;

        let path = self.artifact_path();
        if let Err(e) = fs::remove_file(&path).await {
            debug!("No index artifact to remove at {}: {e}", path.display());
        }
        info!("Cleared search index");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::MAX_INDEXED_CHARS;
    use docdex_store::{DocumentType, MetadataOverrides};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn doc(path: &str, content: &str, overrides: MetadataOverrides) -> Document {
        Document::new(path, content, DocumentType::Text, overrides)
    }

    #[tokio::test]
    async fn test_fox_scenario() {
        let dir = TempDir::new().unwrap();
        let mut index = SearchIndex::open(dir.path()).await.unwrap();

        let d = doc(
            "/notes/fox.txt",
            "The quick brown fox jumps",
            MetadataOverrides::default(),
        );
        index.add_document(&d).await.unwrap();

        let hits = index.search("fox", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, d.id);
        assert!(hits[0].snippet.contains("fox"));
    }

    #[tokio::test]
    async fn test_blank_query_returns_empty() {
        let dir = TempDir::new().unwrap();
        let mut index = SearchIndex::open(dir.path()).await.unwrap();
        let d = doc("/a.txt", "content", MetadataOverrides::default());
        index.add_document(&d).await.unwrap();

        assert!(index.search("", 10).is_empty());
        assert!(index.search("   !!! ", 10).is_empty());
    }

    #[tokio::test]
    async fn test_no_index_short_circuits() {
        let dir = TempDir::new().unwrap();
        let index = SearchIndex::open(dir.path()).await.unwrap();
        assert!(index.search("anything", 10).is_empty());
        assert!(!index.stats().index_exists);
    }

    #[tokio::test]
    async fn test_title_weighting_outranks_body_frequency() {
        let dir = TempDir::new().unwrap();
        let mut index = SearchIndex::open(dir.path()).await.unwrap();

        let titled = doc(
            "/report.txt",
            "the alpha release shipped",
            MetadataOverrides {
                title: Some("Alpha Report".to_string()),
                ..Default::default()
            },
        );
        let noisy = doc(
            "/notes.txt",
            "alpha alpha alpha alpha alpha",
            MetadataOverrides {
                title: Some("Notes".to_string()),
                ..Default::default()
            },
        );
        index.add_document(&titled).await.unwrap();
        index.add_document(&noisy).await.unwrap();

        let hits = index.search("alpha", 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, titled.id);
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_tags_are_searchable_after_update() {
        let dir = TempDir::new().unwrap();
        let mut index = SearchIndex::open(dir.path()).await.unwrap();

        let mut d = doc("/a.txt", "plain body text", MetadataOverrides::default());
        index.add_document(&d).await.unwrap();
        assert!(index.search("kanban", 10).is_empty());

        d.metadata.tags = Some(vec!["kanban".to_string(), "planning".to_string()]);
        index.update_document(&d).await.unwrap();

        let hits = index.search("kanban", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, d.id);
    }

    #[tokio::test]
    async fn test_prefix_expansion_matches_longer_tokens() {
        let dir = TempDir::new().unwrap();
        let mut index = SearchIndex::open(dir.path()).await.unwrap();

        let d = doc(
            "/a.txt",
            "reconciliation strategies for watchers",
            MetadataOverrides::default(),
        );
        index.add_document(&d).await.unwrap();

        // "reconcil" only matches via the prefix form.
        let hits = index.search("reconcil", 10);
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_truncation_cap() {
        let dir = TempDir::new().unwrap();
        let mut index = SearchIndex::open(dir.path()).await.unwrap();

        let mut content = "early needle ".to_string();
        content.push_str(&"filler ".repeat(MAX_INDEXED_CHARS / 7));
        content.push_str(" zebra");
        let d = doc("/big.txt", &content, MetadataOverrides::default());
        index.add_document(&d).await.unwrap();

        assert_eq!(index.search("needle", 10).len(), 1);
        // Beyond the cap: not indexed.
        assert!(index.search("zebra", 10).is_empty());
    }

    #[tokio::test]
    async fn test_remove_document() {
        let dir = TempDir::new().unwrap();
        let mut index = SearchIndex::open(dir.path()).await.unwrap();

        let d = doc("/a.txt", "unique xylophone", MetadataOverrides::default());
        index.add_document(&d).await.unwrap();
        index.remove_document(&d.id).await.unwrap();

        assert!(index.search("xylophone", 10).is_empty());
        assert!(matches!(
            index.remove_document(&d.id).await,
            Err(IndexError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rebuild_to_zero_entries_drops_index() {
        let dir = TempDir::new().unwrap();
        let mut index = SearchIndex::open(dir.path()).await.unwrap();

        let d = doc("/a.txt", "something", MetadataOverrides::default());
        index.add_document(&d).await.unwrap();
        assert!(index.stats().index_exists);

        index.rebuild_from_documents(&[]).await.unwrap();
        assert!(!index.stats().index_exists);
        assert_eq!(index.stats().entry_count, 0);
    }

    #[tokio::test]
    async fn test_rebuild_then_unique_term_is_top_hit() {
        let dir = TempDir::new().unwrap();
        let mut index = SearchIndex::open(dir.path()).await.unwrap();

        let a = doc("/a.txt", "common words here", MetadataOverrides::default());
        let b = doc(
            "/b.txt",
            "common words plus quasar",
            MetadataOverrides::default(),
        );
        index
            .rebuild_from_documents(&[a, b.clone()])
            .await
            .unwrap();

        let hits = index.search("quasar", 10);
        assert_eq!(hits[0].id, b.id);
    }

    #[tokio::test]
    async fn test_persistence_roundtrip() {
        let dir = TempDir::new().unwrap();
        let d = doc("/a.txt", "persistent walrus", MetadataOverrides::default());
        {
            let mut index = SearchIndex::open(dir.path()).await.unwrap();
            index.add_document(&d).await.unwrap();
        }

        let index = SearchIndex::open(dir.path()).await.unwrap();
        let hits = index.search("walrus", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, d.id);
    }

    #[tokio::test]
    async fn test_corrupt_artifact_starts_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), "{broken").unwrap();

        let index = SearchIndex::open(dir.path()).await.unwrap();
        assert_eq!(index.stats().entry_count, 0);
        assert!(!index.stats().index_exists);
    }

    #[tokio::test]
    async fn test_clear_removes_artifact() {
        let dir = TempDir::new().unwrap();
        let mut index = SearchIndex::open(dir.path()).await.unwrap();
        let d = doc("/a.txt", "content", MetadataOverrides::default());
        index.add_document(&d).await.unwrap();

        index.clear().await;
        assert!(!dir.path().join(INDEX_FILE).exists());
        assert!(index.search("content", 10).is_empty());
    }

    #[tokio::test]
    async fn test_limit_truncates_results() {
        let dir = TempDir::new().unwrap();
        let mut index = SearchIndex::open(dir.path()).await.unwrap();

        for i in 0..5 {
            let d = doc(
                &format!("/n{i}.txt"),
                "shared keyword pelican",
                MetadataOverrides::default(),
            );
            index.add_document(&d).await.unwrap();
        }

        assert_eq!(index.search("pelican", 3).len(), 3);
    }
}
