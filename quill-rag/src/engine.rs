//! The retrieval engine: indexing, deletion, and filtered similarity search.
//!
//! [`RetrievalEngine`] owns the [`FlatIndex`] + chunk-record pair for one
//! logical collection. The two structures are positionally aligned and are
//! only ever mutated together, behind a single write lock; after every
//! completed mutation both are persisted through the [`ArtifactStore`] so a
//! restart picks up the last state.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::chunking::{SentenceChunker, clean_transcript};
use crate::document::{
    ChunkMetadata, ChunkRecord, DocumentInfo, IndexOutcome, IndexStatus, SearchHit, StoreStats,
};
use crate::embedding::EmbeddingProvider;
use crate::error::{Result, RetrievalError};
use crate::index::FlatIndex;
use crate::storage::ArtifactStore;

/// Candidates fetched from the index per requested result, to leave room
/// for post-hoc filtering.
const OVERFETCH_FACTOR: usize = 3;

/// Configuration for a [`RetrievalEngine`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Name of the logical collection; also the stem of the persisted blobs.
    pub collection: String,
    /// Default chunk size in characters.
    pub chunk_size: usize,
    /// Default overlap between consecutive chunks.
    pub chunk_overlap: usize,
    /// Hard cap on results per search, regardless of what callers request.
    pub max_results: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { collection: "transcripts".into(), chunk_size: 1000, chunk_overlap: 200, max_results: 20 }
    }
}

impl EngineConfig {
    /// Create a new builder for constructing an [`EngineConfig`].
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

/// Builder for a validated [`EngineConfig`].
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Set the collection name.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.config.collection = name.into();
        self
    }

    /// Set the default chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the default overlap between consecutive chunks.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the hard cap on results per search.
    pub fn max_results(mut self, max: usize) -> Self {
        self.config.max_results = max;
        self
    }

    /// Build the [`EngineConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Config`] if:
    /// - `chunk_overlap >= chunk_size`
    /// - `max_results == 0`
    /// - `collection` is empty
    pub fn build(self) -> Result<EngineConfig> {
        if self.config.chunk_overlap >= self.config.chunk_size {
            return Err(RetrievalError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.config.chunk_overlap, self.config.chunk_size
            )));
        }
        if self.config.max_results == 0 {
            return Err(RetrievalError::Config("max_results must be greater than zero".into()));
        }
        if self.config.collection.is_empty() {
            return Err(RetrievalError::Config("collection name must not be empty".into()));
        }
        Ok(self.config)
    }
}

/// Similarity search, the seam the query-resolution layer depends on.
///
/// [`RetrievalEngine`] is the production implementation; tests substitute
/// scripted ones.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Search for the `n_results` chunks most similar to `query`.
    ///
    /// `filter_ids`, when given, restricts results to those documents;
    /// results scoring below `min_score` are dropped.
    async fn search(
        &self,
        query: &str,
        n_results: usize,
        filter_ids: Option<&[String]>,
        min_score: f32,
    ) -> Result<Vec<SearchHit>>;
}

/// In-memory collection state: the index and its aligned chunk records.
struct CollectionState {
    loaded: bool,
    index: FlatIndex,
    chunks: Vec<ChunkRecord>,
}

/// The retrieval engine for one logical collection.
///
/// Orchestrates cleaning, chunking, embedding, the flat index, and
/// persistence. All mutating operations (`index_document`,
/// `delete_document`, `clear`) serialize on a write lock for their whole
/// read-modify-persist sequence; searches and introspection share a read
/// lock and may run concurrently.
///
/// Document isolation is enforced by metadata filtering over a single
/// shared index, not by partitioning — every query scans (and over-fetches
/// from) the full collection. That bounds this design to collections where
/// an exhaustive scan is acceptable.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use quill_rag::{EngineConfig, FsArtifactStore, OpenAiEmbedder, RetrievalEngine};
///
/// let engine = RetrievalEngine::new(
///     EngineConfig::default(),
///     Arc::new(OpenAiEmbedder::from_env()?),
///     Arc::new(FsArtifactStore::new("./data/vectors")),
/// );
/// engine.index_document("talk_01", &raw_transcript, Default::default(), None, None).await?;
/// let hits = engine.search("pricing", 5, None, 0.0).await?;
/// ```
pub struct RetrievalEngine {
    config: EngineConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    storage: Arc<dyn ArtifactStore>,
    state: RwLock<CollectionState>,
}

impl RetrievalEngine {
    /// Create an engine over the given embedder and storage backend.
    ///
    /// Nothing is read from storage until the first operation.
    pub fn new(
        config: EngineConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        storage: Arc<dyn ArtifactStore>,
    ) -> Self {
        let dimensions = embedder.dimensions();
        Self {
            config,
            embedder,
            storage,
            state: RwLock::new(CollectionState {
                loaded: false,
                index: FlatIndex::new(dimensions),
                chunks: Vec::new(),
            }),
        }
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn index_blob(&self) -> String {
        format!("{}.index.json", self.config.collection)
    }

    fn docs_blob(&self) -> String {
        format!("{}.docs.json", self.config.collection)
    }

    /// Load persisted artifacts on first use.
    async fn ensure_loaded(&self) -> Result<()> {
        if self.state.read().await.loaded {
            return Ok(());
        }

        let mut state = self.state.write().await;
        if state.loaded {
            return Ok(());
        }

        let index_bytes = self.storage.read(&self.index_blob()).await?;
        let docs_bytes = self.storage.read(&self.docs_blob()).await?;

        match (index_bytes, docs_bytes) {
            (Some(index_bytes), Some(docs_bytes)) => {
                let index: FlatIndex =
                    serde_json::from_slice(&index_bytes).map_err(|e| RetrievalError::Store {
                        operation: "load".into(),
                        message: format!("corrupt index artifact: {e}"),
                    })?;
                let chunks: Vec<ChunkRecord> =
                    serde_json::from_slice(&docs_bytes).map_err(|e| RetrievalError::Store {
                        operation: "load".into(),
                        message: format!("corrupt chunk artifact: {e}"),
                    })?;
                if index.len() != chunks.len() {
                    return Err(RetrievalError::Store {
                        operation: "load".into(),
                        message: format!(
                            "artifacts misaligned: {} vectors vs {} chunks",
                            index.len(),
                            chunks.len()
                        ),
                    });
                }
                info!(collection = %self.config.collection, chunks = chunks.len(), "loaded persisted collection");
                state.index = index;
                state.chunks = chunks;
            }
            _ => {
                info!(collection = %self.config.collection, "starting empty collection");
            }
        }

        state.loaded = true;
        Ok(())
    }

    /// Persist both structures. Called after every completed mutation.
    async fn persist(&self, state: &CollectionState) -> Result<()> {
        let index_bytes = serde_json::to_vec(&state.index).map_err(|e| RetrievalError::Store {
            operation: "persist".into(),
            message: format!("serializing index: {e}"),
        })?;
        let docs_bytes = serde_json::to_vec(&state.chunks).map_err(|e| RetrievalError::Store {
            operation: "persist".into(),
            message: format!("serializing chunks: {e}"),
        })?;

        self.storage.write(&self.index_blob(), &index_bytes).await?;
        self.storage.write(&self.docs_blob(), &docs_bytes).await?;
        info!(collection = %self.config.collection, chunks = state.chunks.len(), "persisted collection");
        Ok(())
    }

    /// Index a document: clean, chunk, embed, append, persist.
    ///
    /// Any chunks previously indexed for `document_id` are purged first, so
    /// re-indexing the same document is idempotent and never leaves stale or
    /// duplicate chunks. Content that cleans down to nothing returns
    /// [`IndexStatus::Empty`] without touching the index.
    ///
    /// `chunk_size` / `chunk_overlap` override the configured defaults for
    /// this call only.
    pub async fn index_document(
        &self,
        document_id: &str,
        content: &str,
        tags: HashMap<String, String>,
        chunk_size: Option<usize>,
        chunk_overlap: Option<usize>,
    ) -> Result<IndexOutcome> {
        let chunk_size = chunk_size.unwrap_or(self.config.chunk_size);
        let chunk_overlap = chunk_overlap.unwrap_or(self.config.chunk_overlap);

        let cleaned = clean_transcript(content);
        let chunks = SentenceChunker::new(chunk_size, chunk_overlap).chunk(&cleaned);

        if chunks.is_empty() {
            warn!(document_id, "no chunks generated, index untouched");
            return Ok(IndexOutcome {
                document_id: document_id.to_string(),
                chunks_indexed: 0,
                chunk_size,
                chunk_overlap,
                status: IndexStatus::Empty,
            });
        }

        self.ensure_loaded().await?;
        let mut state = self.state.write().await;

        // Delete-before-add keeps re-indexing idempotent.
        self.purge_document(&mut state, document_id).await?;

        let texts: Vec<&str> = chunks.iter().map(|c| c.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await.inspect_err(|e| {
            error!(document_id, error = %e, "embedding failed during indexing");
        })?;
        state.index.add(embeddings)?;

        let indexed_at = Utc::now();
        let chunk_count = chunks.len();
        for (chunk_index, content) in chunks.into_iter().enumerate() {
            state.chunks.push(ChunkRecord {
                id: format!("{document_id}_chunk_{chunk_index}"),
                metadata: ChunkMetadata {
                    document_id: document_id.to_string(),
                    chunk_index,
                    chunk_count,
                    chunk_length: content.chars().count(),
                    indexed_at,
                    tags: tags.clone(),
                },
                content,
            });
        }

        self.persist(&state).await?;
        info!(document_id, chunks = chunk_count, "indexed document");

        Ok(IndexOutcome {
            document_id: document_id.to_string(),
            chunks_indexed: chunk_count,
            chunk_size,
            chunk_overlap,
            status: IndexStatus::Indexed,
        })
    }

    /// Remove a document's chunks from the in-memory state, rebuilding the
    /// index from the retained complement. Returns how many were removed.
    ///
    /// A flat index has no deletion primitive, so the retained chunks are
    /// re-embedded into a fresh index.
    async fn purge_document(
        &self,
        state: &mut CollectionState,
        document_id: &str,
    ) -> Result<usize> {
        let retained: Vec<ChunkRecord> = state
            .chunks
            .iter()
            .filter(|c| c.metadata.document_id != document_id)
            .cloned()
            .collect();

        if retained.len() == state.chunks.len() {
            return Ok(0);
        }
        let removed = state.chunks.len() - retained.len();

        let mut index = FlatIndex::new(self.embedder.dimensions());
        if !retained.is_empty() {
            let texts: Vec<&str> = retained.iter().map(|c| c.content.as_str()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await.inspect_err(|e| {
                error!(document_id, error = %e, "re-embedding failed during rebuild");
            })?;
            index.add(embeddings)?;
        }

        state.index = index;
        state.chunks = retained;
        info!(document_id, removed, "rebuilt index without document");
        Ok(removed)
    }

    /// Delete all chunks belonging to `document_id`, rebuilding the index
    /// from what remains and persisting the result.
    ///
    /// Returns whether any chunks were removed; deleting a document with no
    /// indexed chunks is a successful no-op.
    pub async fn delete_document(&self, document_id: &str) -> Result<bool> {
        self.ensure_loaded().await?;
        let mut state = self.state.write().await;

        let removed = self.purge_document(&mut state, document_id).await?;
        if removed == 0 {
            return Ok(false);
        }

        self.persist(&state).await?;
        info!(document_id, removed, "deleted document");
        Ok(true)
    }

    /// Search for chunks similar to `query`.
    ///
    /// Over-fetches three times the requested count from the index to leave
    /// room for filtering, applies the `filter_ids` membership filter and
    /// then `min_score`, and truncates to `n_results` (itself capped at the
    /// configured maximum). An empty collection returns an empty `Vec`.
    pub async fn search(
        &self,
        query: &str,
        n_results: usize,
        filter_ids: Option<&[String]>,
        min_score: f32,
    ) -> Result<Vec<SearchHit>> {
        let n_results = n_results.min(self.config.max_results);

        self.ensure_loaded().await?;
        if self.state.read().await.chunks.is_empty() {
            return Ok(Vec::new());
        }

        // Embed outside the lock; writers may proceed meanwhile and the
        // search below runs against whatever snapshot the lock then grants.
        let query_embedding = self.embedder.embed(query).await.inspect_err(|e| {
            error!(error = %e, "query embedding failed");
        })?;

        let state = self.state.read().await;
        let k = (n_results * OVERFETCH_FACTOR).min(state.chunks.len());
        let candidates = state.index.search(&query_embedding, k)?;

        let mut hits = Vec::new();
        for (position, distance) in candidates {
            let record = &state.chunks[position];
            let score = 1.0 / (1.0 + distance);

            if let Some(ids) = filter_ids {
                if !ids.contains(&record.metadata.document_id) {
                    continue;
                }
            }
            if score < min_score {
                continue;
            }

            hits.push(SearchHit {
                id: record.id.clone(),
                content: record.content.clone(),
                metadata: record.metadata.clone(),
                score,
                distance,
            });

            if hits.len() >= n_results {
                break;
            }
        }

        info!(results = hits.len(), requested = n_results, "search completed");
        Ok(hits)
    }

    /// Summary of one indexed document, or `None` if it has no chunks.
    pub async fn document_info(&self, document_id: &str) -> Result<Option<DocumentInfo>> {
        self.ensure_loaded().await?;
        let state = self.state.read().await;

        let mut chunks = state.chunks.iter().filter(|c| c.metadata.document_id == document_id);
        let Some(first) = chunks.next() else {
            return Ok(None);
        };

        Ok(Some(DocumentInfo {
            document_id: document_id.to_string(),
            chunk_count: 1 + chunks.count(),
            indexed_at: first.metadata.indexed_at,
            tags: first.metadata.tags.clone(),
        }))
    }

    /// All indexed documents, in first-indexed order.
    pub async fn list_documents(&self) -> Result<Vec<DocumentInfo>> {
        self.ensure_loaded().await?;
        let state = self.state.read().await;

        let mut order: Vec<DocumentInfo> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();

        for record in &state.chunks {
            match positions.get(record.metadata.document_id.as_str()) {
                Some(&i) => order[i].chunk_count += 1,
                None => {
                    positions.insert(record.metadata.document_id.as_str(), order.len());
                    order.push(DocumentInfo {
                        document_id: record.metadata.document_id.clone(),
                        chunk_count: 1,
                        indexed_at: record.metadata.indexed_at,
                        tags: record.metadata.tags.clone(),
                    });
                }
            }
        }

        Ok(order)
    }

    /// Collection-wide statistics.
    pub async fn stats(&self) -> Result<StoreStats> {
        self.ensure_loaded().await?;
        let state = self.state.read().await;

        let mut documents: Vec<&str> = Vec::new();
        for record in &state.chunks {
            if !documents.contains(&record.metadata.document_id.as_str()) {
                documents.push(&record.metadata.document_id);
            }
        }

        Ok(StoreStats {
            total_chunks: state.chunks.len(),
            total_documents: documents.len(),
            collection: self.config.collection.clone(),
        })
    }

    /// Reset the collection to empty and remove the persisted artifacts.
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.write().await;

        state.index = FlatIndex::new(self.embedder.dimensions());
        state.chunks.clear();
        state.loaded = true;

        self.storage.remove(&self.index_blob()).await?;
        self.storage.remove(&self.docs_blob()).await?;
        info!(collection = %self.config.collection, "cleared collection");
        Ok(())
    }
}

#[async_trait]
impl Retriever for RetrievalEngine {
    async fn search(
        &self,
        query: &str,
        n_results: usize,
        filter_ids: Option<&[String]>,
        min_score: f32,
    ) -> Result<Vec<SearchHit>> {
        RetrievalEngine::search(self, query, n_results, filter_ids, min_score).await
    }
}
