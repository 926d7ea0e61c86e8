//! The vector index: a [`ChunkStore`] paired with an
//! [`EmbeddingProvider`].
//!
//! The index is an explicitly owned value, built once by the application
//! and shared (`Arc<VectorIndex>`) with the ingestor, the retrieval
//! gateway, and the context assembler. Tests build one over
//! [`InMemoryStore`](crate::store::memory::InMemoryStore).
//!
//! Every storage failure is reported as [`IndexError::Unavailable`] and
//! every embedding failure as [`IndexError::Embedding`]. Neither is
//! retried here. An empty result is `Ok(vec![])`, never an error.

use std::sync::Arc;

use tracing::debug;

use crate::embedding::{embed_query, EmbeddingProvider};
use crate::error::IndexError;
use crate::filter::ChunkFilter;
use crate::models::{Chunk, ScoredChunk, SourceSummary};
use crate::store::ChunkStore;

/// Default number of texts sent to the embedding provider per call.
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 64;

pub struct VectorIndex {
    store: Arc<dyn ChunkStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl VectorIndex {
    pub fn new(store: Arc<dyn ChunkStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            embedder,
            batch_size: DEFAULT_EMBED_BATCH_SIZE,
        }
    }

    /// Set the embedding batch size (minimum 1).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Persist chunks with their embeddings.
    ///
    /// Chunks that arrive without an embedding are embedded here, in
    /// batches. The whole sequence is handed to the store in one call.
    /// No deduplication: re-adding a `(source_id, chunk_index)` pair
    /// stores it twice.
    pub async fn add(&self, chunks: &[Chunk]) -> Result<(), IndexError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let mut prepared = chunks.to_vec();
        let missing: Vec<usize> = prepared
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_embedded())
            .map(|(i, _)| i)
            .collect();

        for batch in missing.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|&i| prepared[i].text.clone()).collect();
            let vectors = self
                .embedder
                .embed(&texts)
                .await
                .map_err(IndexError::embedding)?;
            if vectors.len() != texts.len() {
                return Err(IndexError::Embedding(format!(
                    "provider returned {} vectors for {} texts",
                    vectors.len(),
                    texts.len()
                )));
            }
            for (&i, vector) in batch.iter().zip(vectors) {
                prepared[i].embedding = vector;
            }
        }

        debug!(
            chunks = prepared.len(),
            embedded = missing.len(),
            model = self.embedder.model_name(),
            "adding chunks to index"
        );

        self.store
            .insert_chunks(&prepared)
            .await
            .map_err(IndexError::unavailable)
    }

    /// Top-`k` chunks by semantic similarity to `query_text`, descending.
    ///
    /// Returns fewer than `k` results when fewer chunks match, and an
    /// empty vector when none do.
    pub async fn similarity_search(
        &self,
        query_text: &str,
        k: usize,
        filter: Option<&ChunkFilter>,
    ) -> Result<Vec<ScoredChunk>, IndexError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_vec = embed_query(self.embedder.as_ref(), query_text)
            .await
            .map_err(IndexError::embedding)?;

        let hits = self
            .store
            .vector_search(&query_vec, k, filter)
            .await
            .map_err(IndexError::unavailable)?;

        debug!(
            k,
            filter = ?filter,
            hits = hits.len(),
            "similarity search"
        );
        Ok(hits)
    }

    /// Every chunk matching `filter`, exact match, unordered.
    pub async fn get_by_filter(&self, filter: &ChunkFilter) -> Result<Vec<Chunk>, IndexError> {
        self.store
            .chunks_matching(filter)
            .await
            .map_err(IndexError::unavailable)
    }

    /// Distinct sources with their chunk counts.
    pub async fn sources(&self) -> Result<Vec<SourceSummary>, IndexError> {
        self.store
            .list_sources()
            .await
            .map_err(IndexError::unavailable)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use anyhow::{bail, Result};
    use async_trait::async_trait;

    use super::*;
    use crate::embedding::HashingEmbedder;
    use crate::store::memory::InMemoryStore;

    /// A store whose every operation fails, standing in for an
    /// unreachable database.
    pub struct UnreachableStore;

    #[async_trait]
    impl ChunkStore for UnreachableStore {
        async fn insert_chunks(&self, _chunks: &[Chunk]) -> Result<()> {
            bail!("connection refused")
        }

        async fn vector_search(
            &self,
            _query_vec: &[f32],
            _limit: usize,
            _filter: Option<&ChunkFilter>,
        ) -> Result<Vec<ScoredChunk>> {
            bail!("connection refused")
        }

        async fn chunks_matching(&self, _filter: &ChunkFilter) -> Result<Vec<Chunk>> {
            bail!("connection refused")
        }

        async fn list_sources(&self) -> Result<Vec<SourceSummary>> {
            bail!("connection refused")
        }
    }

    pub fn memory_index() -> Arc<VectorIndex> {
        Arc::new(VectorIndex::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(HashingEmbedder::new(128)),
        ))
    }

    pub fn unreachable_index() -> Arc<VectorIndex> {
        Arc::new(VectorIndex::new(
            Arc::new(UnreachableStore),
            Arc::new(HashingEmbedder::new(128)),
        ))
    }
}
