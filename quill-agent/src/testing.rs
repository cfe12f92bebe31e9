//! Test doubles shared by the agent unit tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;

use quill_rag::{ChunkMetadata, Retriever, SearchHit};

/// A [`Retriever`] that serves a fixed set of hits, honoring the filter
/// and truncation semantics of the real engine.
pub struct StubRetriever {
    hits: Vec<SearchHit>,
}

impl StubRetriever {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self { hits }
    }
}

#[async_trait]
impl Retriever for StubRetriever {
    async fn search(
        &self,
        _query: &str,
        n_results: usize,
        filter_ids: Option<&[String]>,
        min_score: f32,
    ) -> quill_rag::Result<Vec<SearchHit>> {
        let mut hits: Vec<SearchHit> = self
            .hits
            .iter()
            .filter(|h| filter_ids.is_none_or(|ids| ids.contains(&h.metadata.document_id)))
            .filter(|h| h.score >= min_score)
            .cloned()
            .collect();
        hits.truncate(n_results);
        Ok(hits)
    }
}

/// Build a hit with the given score; the distance is derived so that
/// `score == 1 / (1 + distance)` holds.
pub fn hit(document_id: &str, chunk_index: usize, score: f32) -> SearchHit {
    SearchHit {
        id: format!("{document_id}_chunk_{chunk_index}"),
        content: format!("Chunk {chunk_index} of {document_id} discussing the topic in detail."),
        metadata: ChunkMetadata {
            document_id: document_id.to_string(),
            chunk_index,
            chunk_count: chunk_index + 1,
            chunk_length: 64,
            indexed_at: Utc::now(),
            tags: HashMap::new(),
        },
        score,
        distance: 1.0 / score - 1.0,
    }
}
