//! Typed metadata filter.
//!
//! Every caller in the system filters by exactly one key, the source
//! identifier, so the filter is a closed enum rather than an open
//! key/value map. Serialized with serde's external tagging it produces
//! the wire shape `{"source": "<source_id>"}`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::Chunk;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkFilter {
    /// Match chunks whose `source` metadata equals the value.
    Source(String),
}

impl ChunkFilter {
    pub fn source(source_id: impl Into<String>) -> Self {
        ChunkFilter::Source(source_id.into())
    }

    pub fn matches(&self, chunk: &Chunk) -> bool {
        match self {
            ChunkFilter::Source(source) => chunk.source_id == *source,
        }
    }
}

impl fmt::Display for ChunkFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkFilter::Source(source) => write!(f, "source={}", source),
        }
    }
}
