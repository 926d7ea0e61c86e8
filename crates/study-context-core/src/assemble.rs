//! Budgeted, structure-preserving context assembly.
//!
//! Given a source identifier and a character budget, the
//! [`ContextAssembler`] rebuilds the document from its chunks in
//! `chunk_index` order. If the document exceeds the budget it keeps a
//! head quota, a tail quota, and an evenly spaced sample of the middle,
//! rather than truncating or sampling at random.
//!
//! # Sampling Algorithm
//!
//! 1. Fetch all chunks for the source; none → empty string.
//! 2. Sort by `chunk_index`.
//! 3. Join with `"\n\n"` into `full_text`; if it fits the budget, return it.
//! 4. `avg = len(full_text) / (total + capacity_bias)`,
//!    `max_chunks = floor(max_chars / avg)`.
//! 5. `max_chunks ≥ total` → return `full_text`.
//! 6. `start = max(1, ⌊max_chunks·head⌋)`, `end = max(1, ⌊max_chunks·tail⌋)`,
//!    `middle = max(0, max_chunks − start − end)`.
//! 7. Head positions `0..start`, tail positions `total−end..total`.
//! 8. Middle span `[start, total−end)`: `step = span / middle`, positions
//!    `start + ⌊i·step⌋` for `i in 0..middle`.
//! 9. Union, sort, join the selected texts.
//!
//! Lengths are counted in characters. A window is never cut mid-chunk.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::IndexError;
use crate::filter::ChunkFilter;
use crate::index::VectorIndex;

/// Separator placed between chunk texts in an assembled window.
pub const CHUNK_SEPARATOR: &str = "\n\n";

/// Tunables for stratified sampling.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    /// Share of `max_chunks` taken from the start of the document.
    pub head_fraction: f64,
    /// Share of `max_chunks` taken from the end of the document.
    pub tail_fraction: f64,
    /// Added to the chunk count when estimating the average chunk size.
    /// A larger bias shrinks the estimated average and so admits more
    /// chunks; `1` can overshoot `max_chars` by a fraction of a chunk.
    pub capacity_bias: usize,
    /// Shrink the sample until the window fits `max_chars`; fall back to
    /// the full text when even one head and one tail chunk do not fit.
    pub strict_budget: bool,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            head_fraction: 0.20,
            tail_fraction: 0.10,
            capacity_bias: 1,
            strict_budget: false,
        }
    }
}

/// Quotas and selected positions for one sampling pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplePlan {
    pub max_chunks: usize,
    pub start_alloc: usize,
    pub end_alloc: usize,
    pub middle_alloc: usize,
    /// Selected positions into the ordered chunk list, ascending, unique.
    pub positions: Vec<usize>,
}

/// Estimate how many chunks fit in `max_chars`.
///
/// `full_len` must be positive whenever sampling is needed, since the
/// document exceeds a non-negative budget.
pub fn estimate_capacity(
    full_len: usize,
    total_chunks: usize,
    max_chars: usize,
    capacity_bias: usize,
) -> usize {
    let avg_chunk_size = full_len as f64 / (total_chunks + capacity_bias).max(1) as f64;
    if avg_chunk_size <= 0.0 {
        return total_chunks;
    }
    (max_chars as f64 / avg_chunk_size).floor() as usize
}

/// Allocate head, tail, and middle quotas and pick positions.
///
/// Head and tail quotas are at least one chunk each, bounded by
/// `total_chunks`; overlapping selections collapse in the set.
pub fn plan_sample(total_chunks: usize, max_chunks: usize, params: &SamplingParams) -> SamplePlan {
    let start_alloc = quota(max_chunks, params.head_fraction);
    let end_alloc = quota(max_chunks, params.tail_fraction);
    let middle_alloc = max_chunks.saturating_sub(start_alloc + end_alloc);

    let head_end = start_alloc.min(total_chunks);
    let tail_start = total_chunks.saturating_sub(end_alloc);

    let mut selected: BTreeSet<usize> = BTreeSet::new();
    selected.extend(0..head_end);
    selected.extend(tail_start..total_chunks);

    if tail_start > start_alloc && middle_alloc > 0 {
        let span = (tail_start - start_alloc) as f64;
        let step = span / middle_alloc as f64;
        for i in 0..middle_alloc {
            selected.insert(start_alloc + (i as f64 * step).floor() as usize);
        }
    }

    SamplePlan {
        max_chunks,
        start_alloc,
        end_alloc,
        middle_alloc,
        positions: selected.into_iter().collect(),
    }
}

fn quota(max_chunks: usize, fraction: f64) -> usize {
    ((max_chunks as f64 * fraction).floor() as usize).max(1)
}

/// Fit ordered chunk texts into `max_chars` by stratified sampling.
///
/// Pure and deterministic; [`ContextAssembler::assemble`] delegates here
/// once the chunks are fetched and sorted.
pub fn sample_texts(texts: &[&str], max_chars: usize, params: &SamplingParams) -> String {
    if texts.is_empty() {
        return String::new();
    }

    let full_text = texts.join(CHUNK_SEPARATOR);
    let full_len = full_text.chars().count();
    if full_len <= max_chars {
        return full_text;
    }

    let total_chunks = texts.len();
    let max_chunks = estimate_capacity(full_len, total_chunks, max_chars, params.capacity_bias);
    if max_chunks >= total_chunks {
        return full_text;
    }

    let plan = plan_sample(total_chunks, max_chunks, params);
    debug!(
        total_chunks,
        max_chunks,
        start_alloc = plan.start_alloc,
        end_alloc = plan.end_alloc,
        middle_alloc = plan.middle_alloc,
        selected = plan.positions.len(),
        "sampling context window"
    );
    let window = join_positions(texts, &plan.positions);

    if !params.strict_budget || window.chars().count() <= max_chars {
        return window;
    }

    for budget in (0..max_chunks).rev() {
        let plan = plan_sample(total_chunks, budget, params);
        let window = join_positions(texts, &plan.positions);
        if window.chars().count() <= max_chars {
            return window;
        }
    }

    warn!(
        max_chars,
        full_len, "budget smaller than any chunk selection; returning full text"
    );
    full_text
}

fn join_positions(texts: &[&str], positions: &[usize]) -> String {
    positions
        .iter()
        .filter_map(|&p| texts.get(p).copied())
        .collect::<Vec<_>>()
        .join(CHUNK_SEPARATOR)
}

/// Builds bounded context windows for whole documents.
pub struct ContextAssembler {
    index: Arc<VectorIndex>,
    params: SamplingParams,
}

impl ContextAssembler {
    pub fn new(index: Arc<VectorIndex>, params: SamplingParams) -> Self {
        Self { index, params }
    }

    /// Context window for `source_id` within `max_chars`.
    ///
    /// Never fails: any retrieval error is logged and becomes an empty
    /// string, which callers treat as "no usable material".
    pub async fn assemble(&self, source_id: &str, max_chars: usize) -> String {
        match self.try_assemble(source_id, max_chars).await {
            Ok(text) => text,
            Err(err) => {
                warn!(
                    source_id,
                    error = %err,
                    "context assembly failed; returning empty context"
                );
                String::new()
            }
        }
    }

    /// Like [`assemble`](Self::assemble) but reports retrieval errors.
    pub async fn try_assemble(
        &self,
        source_id: &str,
        max_chars: usize,
    ) -> Result<String, IndexError> {
        let mut chunks = self
            .index
            .get_by_filter(&ChunkFilter::source(source_id))
            .await?;

        if chunks.is_empty() {
            debug!(source_id, "no chunks for source");
            return Ok(String::new());
        }

        chunks.sort_by_key(|c| c.chunk_index);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        Ok(sample_texts(&texts, max_chars, &self.params))
    }
}
