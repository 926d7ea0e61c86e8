//! Core data models for the ingestion and retrieval pipeline.

use serde::{Deserialize, Serialize};

/// A bounded, ordered segment of a document's text.
///
/// Chunks are created by the ingestion pipeline and never mutated once
/// added to the index. `(source_id, chunk_index)` identifies a chunk
/// within one ingestion; `chunk_index` defines document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_id: String,
    pub chunk_index: usize,
    /// Embedding vector. Empty until the index embeds the chunk.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

impl Chunk {
    /// Build an un-embedded chunk.
    pub fn new(source_id: impl Into<String>, chunk_index: usize, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_id: source_id.into(),
            chunk_index,
            embedding: Vec::new(),
        }
    }

    /// The metadata record persisted alongside this chunk.
    pub fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            source: self.source_id.clone(),
            chunk_index: self.chunk_index,
        }
    }

    pub fn is_embedded(&self) -> bool {
        !self.embedding.is_empty()
    }
}

/// Per-chunk metadata. Serializes to exactly
/// `{"source": "<source_id>", "chunk_index": <n>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub chunk_index: usize,
}

/// A chunk paired with its relevance to a query (cosine similarity).
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Chunk count for one source, as listed by the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub source_id: String,
    pub chunk_count: usize,
}
