//! Ordered fallback chain for producing generation context.
//!
//! Each [`ContextStrategy`] either produces text, produces nothing, or
//! fails. [`StrategyChain::run`] tries strategies in order and stops at
//! the first success, recording every attempt so callers can log which
//! path produced the context.
//!
//! | Strategy | Needs | Produces |
//! |----------|-------|----------|
//! | `assembled-document` | `source_id` | [`ContextAssembler`] window |
//! | `ranked-retrieval` | `query` | top-`k` chunks, source-prefixed |
//! | `raw-text` | `raw_text` | trimmed text cut to `max_chars` |

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::assemble::ContextAssembler;
use crate::filter::ChunkFilter;
use crate::retrieval::{format_context, RetrievalGateway, SourceAttribution};

/// Inputs available to every strategy. Strategies skip themselves
/// (returning [`StrategyOutcome::Empty`]) when their input is absent.
#[derive(Debug, Clone, Default)]
pub struct ContextRequest {
    pub source_id: Option<String>,
    pub query: Option<String>,
    pub raw_text: Option<String>,
    pub max_chars: usize,
    pub k: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum StrategyOutcome {
    Success(String),
    Empty,
    Failed(String),
}

#[async_trait]
pub trait ContextStrategy: Send + Sync {
    fn name(&self) -> &str;
    async fn attempt(&self, request: &ContextRequest) -> StrategyOutcome;
}

/// Whole-document window from the [`ContextAssembler`].
pub struct AssembledDocument {
    assembler: Arc<ContextAssembler>,
}

impl AssembledDocument {
    pub const NAME: &'static str = "assembled-document";

    pub fn new(assembler: Arc<ContextAssembler>) -> Self {
        Self { assembler }
    }
}

#[async_trait]
impl ContextStrategy for AssembledDocument {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn attempt(&self, request: &ContextRequest) -> StrategyOutcome {
        let Some(source_id) = request.source_id.as_deref() else {
            return StrategyOutcome::Empty;
        };
        let assembled = self
            .assembler
            .try_assemble(source_id, request.max_chars)
            .await;
        match assembled {
            Ok(text) if text.trim().is_empty() => StrategyOutcome::Empty,
            Ok(text) => StrategyOutcome::Success(text),
            Err(err) => StrategyOutcome::Failed(err.to_string()),
        }
    }
}

/// Top-`k` retrieval for the request's query, narrowed to its source
/// when one is given.
pub struct RankedRetrieval {
    gateway: Arc<RetrievalGateway>,
}

impl RankedRetrieval {
    pub fn new(gateway: Arc<RetrievalGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ContextStrategy for RankedRetrieval {
    fn name(&self) -> &str {
        "ranked-retrieval"
    }

    async fn attempt(&self, request: &ContextRequest) -> StrategyOutcome {
        let Some(query) = request.query.as_deref() else {
            return StrategyOutcome::Empty;
        };
        let filter = request.source_id.as_deref().map(ChunkFilter::source);
        let retrieved = self
            .gateway
            .retrieve(query, request.k, filter.as_ref())
            .await;
        match retrieved {
            Ok(chunks) if chunks.is_empty() => StrategyOutcome::Empty,
            Ok(chunks) => {
                StrategyOutcome::Success(format_context(&chunks, SourceAttribution::Prefix))
            }
            Err(err) => StrategyOutcome::Failed(err.to_string()),
        }
    }
}

/// Last resort: the caller's own text, trimmed and cut to `max_chars`.
pub struct RawText;

#[async_trait]
impl ContextStrategy for RawText {
    fn name(&self) -> &str {
        "raw-text"
    }

    async fn attempt(&self, request: &ContextRequest) -> StrategyOutcome {
        let text = request.raw_text.as_deref().map(str::trim).unwrap_or("");
        if text.is_empty() {
            return StrategyOutcome::Empty;
        }
        StrategyOutcome::Success(truncate_chars(text, request.max_chars).to_string())
    }
}

/// Longest prefix of `text` with at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// One strategy's result within a [`ChainReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyAttempt {
    pub strategy: String,
    #[serde(flatten)]
    pub outcome: StrategyOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    /// Name of the strategy that produced `text`, if any did.
    pub selected: Option<String>,
    pub text: String,
    pub attempts: Vec<StrategyAttempt>,
}

pub struct StrategyChain {
    strategies: Vec<Box<dyn ContextStrategy>>,
}

impl StrategyChain {
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    pub fn with(mut self, strategy: impl ContextStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Assembled document, then ranked retrieval, then raw text.
    pub fn standard(assembler: Arc<ContextAssembler>, gateway: Arc<RetrievalGateway>) -> Self {
        Self::new()
            .with(AssembledDocument::new(assembler))
            .with(RankedRetrieval::new(gateway))
            .with(RawText)
    }

    pub async fn run(&self, request: &ContextRequest) -> ChainReport {
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            let outcome = strategy.attempt(request).await;
            match &outcome {
                StrategyOutcome::Success(text) => {
                    debug!(
                        strategy = strategy.name(),
                        chars = text.chars().count(),
                        "context strategy succeeded"
                    );
                    let text = text.clone();
                    attempts.push(StrategyAttempt {
                        strategy: strategy.name().to_string(),
                        outcome,
                    });
                    return ChainReport {
                        selected: Some(strategy.name().to_string()),
                        text,
                        attempts,
                    };
                }
                StrategyOutcome::Failed(reason) => {
                    warn!(
                        strategy = strategy.name(),
                        %reason,
                        "context strategy failed; trying next"
                    );
                }
                StrategyOutcome::Empty => {
                    debug!(strategy = strategy.name(), "context strategy produced nothing");
                }
            }
            attempts.push(StrategyAttempt {
                strategy: strategy.name().to_string(),
                outcome,
            });
        }

        ChainReport {
            selected: None,
            text: String::new(),
            attempts,
        }
    }
}

impl Default for StrategyChain {
    fn default() -> Self {
        Self::new()
    }
}
