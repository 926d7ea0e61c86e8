//! Retrieval gateway: the query-facing contract used by chat, homework,
//! quiz, and lesson generation.
//!
//! A filtered query that matches nothing is widened to an unfiltered
//! query with the same `k`, so a narrow document filter never leaves the
//! caller without material. Index failures propagate unchanged: "no
//! results" is `Ok(vec![])`, "index unavailable" is `Err`.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::IndexError;
use crate::filter::ChunkFilter;
use crate::index::VectorIndex;
use crate::models::Chunk;

/// Separator between chunk texts handed to a generation task.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Whether [`format_context`] prefixes each chunk with its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceAttribution {
    #[default]
    Omit,
    Prefix,
}

pub struct RetrievalGateway {
    index: Arc<VectorIndex>,
}

impl RetrievalGateway {
    pub fn new(index: Arc<VectorIndex>) -> Self {
        Self { index }
    }

    /// Ranked chunks for `query_text`, most relevant first. Scores are
    /// dropped at this boundary.
    pub async fn retrieve(
        &self,
        query_text: &str,
        k: usize,
        filter: Option<&ChunkFilter>,
    ) -> Result<Vec<Chunk>, IndexError> {
        let mut hits = self.index.similarity_search(query_text, k, filter).await?;

        if hits.is_empty() {
            if let Some(filter) = filter {
                warn!(%filter, k, "filtered retrieval found nothing; widening to all sources");
                hits = self.index.similarity_search(query_text, k, None).await?;
            }
        }

        debug!(k, results = hits.len(), "retrieve");
        Ok(hits.into_iter().map(|hit| hit.chunk).collect())
    }
}

/// Join chunk texts with blank lines for a generation prompt.
///
/// With [`SourceAttribution::Prefix`] each chunk is preceded by a
/// `[Source: <source_id>]` line.
pub fn format_context(chunks: &[Chunk], attribution: SourceAttribution) -> String {
    chunks
        .iter()
        .map(|chunk| match attribution {
            SourceAttribution::Omit => chunk.text.clone(),
            SourceAttribution::Prefix => format!("[Source: {}]\n{}", chunk.source_id, chunk.text),
        })
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}
