//! Storage abstraction for chunk rows and their embeddings.
//!
//! The [`ChunkStore`] trait is the persistence contract behind the
//! [`VectorIndex`](crate::index::VectorIndex): append chunks, rank by
//! vector similarity, and fetch every chunk matching a filter. Backends
//! report failures as `anyhow::Error`; the index classifies them.
//!
//! Implementations must be `Send + Sync`: one store instance is shared
//! by concurrent ingestion and read paths.

pub mod memory;

use std::cmp::Ordering;

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::filter::ChunkFilter;
use crate::models::{Chunk, ScoredChunk, SourceSummary};

/// Abstract storage backend for chunks.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert_chunks`](ChunkStore::insert_chunks) | Append embedded chunks (no dedup) |
/// | [`vector_search`](ChunkStore::vector_search) | Top-k by cosine similarity |
/// | [`chunks_matching`](ChunkStore::chunks_matching) | All chunks matching a filter |
/// | [`list_sources`](ChunkStore::list_sources) | Sources with chunk counts |
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Append chunks. A batch is written as a unit so that concurrent
    /// batches for different sources never interleave.
    async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<()>;

    /// Return up to `limit` chunks ordered by descending cosine
    /// similarity to `query_vec`, restricted to `filter` when given.
    async fn vector_search(
        &self,
        query_vec: &[f32],
        limit: usize,
        filter: Option<&ChunkFilter>,
    ) -> Result<Vec<ScoredChunk>>;

    /// Return every chunk matching `filter`, in no particular order.
    async fn chunks_matching(&self, filter: &ChunkFilter) -> Result<Vec<Chunk>>;

    /// Return each distinct source with its chunk count, sorted by source.
    async fn list_sources(&self) -> Result<Vec<SourceSummary>>;
}

/// Score candidates against `query_vec` and keep the best `limit`.
///
/// Ties are broken by `(source_id, chunk_index)` so that identical
/// inputs always produce identical rankings.
pub fn rank_by_similarity<I>(query_vec: &[f32], candidates: I, limit: usize) -> Vec<ScoredChunk>
where
    I: IntoIterator<Item = Chunk>,
{
    let mut scored: Vec<ScoredChunk> = candidates
        .into_iter()
        .map(|chunk| ScoredChunk {
            score: cosine_similarity(query_vec, &chunk.embedding),
            chunk,
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.chunk.source_id.cmp(&b.chunk.source_id))
            .then_with(|| a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
    });
    scored.truncate(limit);
    scored
}
