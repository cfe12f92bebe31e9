//! # quill-rag
//!
//! The retrieval half of quill: turns raw transcripts into searchable
//! vector chunks and serves approximate similarity search over them.
//!
//! ## Overview
//!
//! - [`clean_transcript`] / [`SentenceChunker`] — caption cleanup and
//!   overlapping sentence-aware chunking
//! - [`EmbeddingProvider`] — the embedding capability seam, with
//!   [`OpenAiEmbedder`] (API-backed) and [`HashingEmbedder`] (offline,
//!   deterministic) implementations
//! - [`FlatIndex`] — brute-force squared-L2 index, add-only, rebuilt on
//!   deletion
//! - [`ArtifactStore`] / [`FsArtifactStore`] — durable persistence of the
//!   serialized collection artifacts
//! - [`RetrievalEngine`] — the orchestrator tying the above together, and
//!   [`Retriever`], the search seam consumed by `quill-agent`
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use quill_rag::{EngineConfig, FsArtifactStore, HashingEmbedder, RetrievalEngine};
//!
//! # async fn run() -> quill_rag::Result<()> {
//! let engine = RetrievalEngine::new(
//!     EngineConfig::default(),
//!     Arc::new(HashingEmbedder::new(256)),
//!     Arc::new(FsArtifactStore::new("./data/vectors")),
//! );
//!
//! engine.index_document("talk_01", "raw transcript text", Default::default(), None, None).await?;
//! let hits = engine.search("what was discussed?", 5, None, 0.0).await?;
//! # Ok(())
//! # }
//! ```

pub mod chunking;
pub mod document;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod hashing;
pub mod index;
pub mod openai;
pub mod storage;

pub use chunking::{SentenceChunker, clean_transcript};
pub use document::{
    ChunkMetadata, ChunkRecord, DocumentInfo, IndexOutcome, IndexStatus, SearchHit, StoreStats,
};
pub use embedding::EmbeddingProvider;
pub use engine::{EngineConfig, EngineConfigBuilder, RetrievalEngine, Retriever};
pub use error::{Result, RetrievalError};
pub use hashing::HashingEmbedder;
pub use index::FlatIndex;
pub use openai::OpenAiEmbedder;
pub use storage::{ArtifactStore, FsArtifactStore};
