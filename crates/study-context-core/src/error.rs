//! Errors surfaced at the vector index boundary.
//!
//! Storage backends report failures as `anyhow::Error`; the
//! [`VectorIndex`](crate::index::VectorIndex) classifies them into
//! [`IndexError`] so callers can tell "index unavailable" apart from
//! an empty result, which is never an error.

use std::fmt::Display;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The underlying storage could not be reached or failed mid-call.
    /// Fatal for the current request; the index never retries.
    #[error("vector index unavailable: {0}")]
    Unavailable(String),

    /// The embedding provider failed to embed chunks or a query.
    #[error("embedding failed: {0}")]
    Embedding(String),
}

impl IndexError {
    pub fn unavailable(err: impl Display) -> Self {
        IndexError::Unavailable(format!("{:#}", err))
    }

    pub fn embedding(err: impl Display) -> Self {
        IndexError::Embedding(format!("{:#}", err))
    }
}
