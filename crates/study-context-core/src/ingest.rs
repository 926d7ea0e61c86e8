//! Ingestion: chunk one document's text and add it to the index.
//!
//! There is no transaction spanning chunking and indexing. If the store
//! fails mid-way the document may be partially indexed; callers re-ingest
//! under a fresh source identifier.

use std::sync::Arc;

use tracing::info;

use crate::chunk::{chunk_text, ChunkingParams};
use crate::error::IndexError;
use crate::index::VectorIndex;

pub struct Ingestor {
    index: Arc<VectorIndex>,
    params: ChunkingParams,
}

impl Ingestor {
    pub fn new(index: Arc<VectorIndex>, params: ChunkingParams) -> Self {
        Self { index, params }
    }

    /// Chunk `raw_text`, embed the chunks, and add them under `source_id`.
    ///
    /// Returns the number of chunks added. Empty text adds nothing and
    /// returns 0 without touching the index.
    pub async fn ingest(&self, source_id: &str, raw_text: &str) -> Result<usize, IndexError> {
        let chunks = chunk_text(source_id, raw_text, self.params);
        if chunks.is_empty() {
            return Ok(0);
        }

        self.index.add(&chunks).await?;

        info!(
            source_id,
            chunks = chunks.len(),
            text_chars = raw_text.chars().count(),
            "ingested document"
        );
        Ok(chunks.len())
    }
}
