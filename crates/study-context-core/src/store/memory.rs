//! In-memory [`ChunkStore`] implementation for tests and embedded use.
//!
//! Rows live in a `Vec` behind `std::sync::RwLock`. Vector search is
//! brute-force cosine similarity over the (optionally filtered) rows.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::filter::ChunkFilter;
use crate::models::{Chunk, ScoredChunk, SourceSummary};

use super::{rank_by_similarity, ChunkStore};

/// In-memory chunk store.
pub struct InMemoryStore {
    rows: RwLock<Vec<Chunk>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Chunk>>> {
        self.rows
            .read()
            .map_err(|_| anyhow!("in-memory chunk store lock poisoned"))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChunkStore for InMemoryStore {
    async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| anyhow!("in-memory chunk store lock poisoned"))?;
        rows.extend_from_slice(chunks);
        Ok(())
    }

    async fn vector_search(
        &self,
        query_vec: &[f32],
        limit: usize,
        filter: Option<&ChunkFilter>,
    ) -> Result<Vec<ScoredChunk>> {
        let rows = self.read()?;
        let candidates = rows
            .iter()
            .filter(|c| filter.map_or(true, |f| f.matches(c)))
            .cloned();
        Ok(rank_by_similarity(query_vec, candidates, limit))
    }

    async fn chunks_matching(&self, filter: &ChunkFilter) -> Result<Vec<Chunk>> {
        let rows = self.read()?;
        Ok(rows.iter().filter(|c| filter.matches(c)).cloned().collect())
    }

    async fn list_sources(&self) -> Result<Vec<SourceSummary>> {
        let rows = self.read()?;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for row in rows.iter() {
            *counts.entry(row.source_id.as_str()).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(source_id, chunk_count)| SourceSummary {
                source_id: source_id.to_string(),
                chunk_count,
            })
            .collect())
    }
}
