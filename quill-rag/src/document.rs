//! Data types for indexed chunks and search results.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata attached to every indexed chunk.
///
/// The typed fields are written by the engine at indexing time; `tags` holds
/// whatever the caller supplied (tenant identifier, conversation scope, ...)
/// and is flattened into the same map when serialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    /// The document this chunk was cut from.
    pub document_id: String,
    /// 0-based position of the chunk within its document.
    pub chunk_index: usize,
    /// Total number of chunks produced from the document.
    pub chunk_count: usize,
    /// Length of the chunk content in characters.
    pub chunk_length: usize,
    /// When the document was indexed.
    pub indexed_at: DateTime<Utc>,
    /// Caller-supplied tags, carried through verbatim.
    #[serde(flatten)]
    pub tags: HashMap<String, String>,
}

/// An immutable unit of indexed text.
///
/// Created in batch when a document is indexed, never mutated, and destroyed
/// only when its whole document is deleted (which rebuilds the index).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkRecord {
    /// Unique id, `{document_id}_chunk_{n}`.
    pub id: String,
    /// The chunk's text content.
    pub content: String,
    /// Typed metadata plus caller tags.
    pub metadata: ChunkMetadata,
}

/// A retrieved chunk with its similarity score.
///
/// `distance` is the raw squared-L2 distance reported by the index;
/// `score = 1 / (1 + distance)` maps it into `(0, 1]`, higher is closer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// The chunk id.
    pub id: String,
    /// The chunk's text content.
    pub content: String,
    /// The chunk's metadata.
    pub metadata: ChunkMetadata,
    /// Similarity score in `(0, 1]`.
    pub score: f32,
    /// Raw squared-L2 distance from the query vector.
    pub distance: f32,
}

/// Whether an indexing call stored anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStatus {
    /// Chunks were embedded and stored.
    Indexed,
    /// The cleaned content produced no chunks; the index was not touched.
    Empty,
}

/// Outcome of [`index_document`](crate::RetrievalEngine::index_document).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexOutcome {
    /// The document that was indexed.
    pub document_id: String,
    /// Number of chunks stored.
    pub chunks_indexed: usize,
    /// The chunk size actually used.
    pub chunk_size: usize,
    /// The chunk overlap actually used.
    pub chunk_overlap: usize,
    /// Whether anything was stored.
    pub status: IndexStatus,
}

/// Per-document summary derived from the chunk store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// The document id.
    pub document_id: String,
    /// Number of chunks currently indexed for the document.
    pub chunk_count: usize,
    /// When the document was (last) indexed.
    pub indexed_at: DateTime<Utc>,
    /// Caller tags recorded at indexing time.
    pub tags: HashMap<String, String>,
}

/// Collection-wide statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    /// Total chunks across all documents.
    pub total_chunks: usize,
    /// Number of distinct documents.
    pub total_documents: usize,
    /// The collection name.
    pub collection: String,
}
