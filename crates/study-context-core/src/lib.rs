//! # Study Context Core
//!
//! Knowledge ingestion and context assembly for document-grounded
//! generation tasks (chat, quiz, homework help).
//!
//! This crate holds no database driver, HTTP client, or filesystem I/O.
//! Storage is reached through the [`store::ChunkStore`] trait and
//! embeddings through [`embedding::EmbeddingProvider`]; the application
//! crate supplies concrete backends.
//!
//! ## Pipeline
//!
//! ```text
//! text ──▶ chunk ──▶ VectorIndex::add                      (write path)
//! query ─▶ RetrievalGateway ──▶ VectorIndex::similarity_search
//! source + budget ─▶ ContextAssembler ──▶ VectorIndex::get_by_filter
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | `Chunk`, `ChunkMetadata`, `ScoredChunk` |
//! | [`filter`] | Closed, typed metadata filter |
//! | [`chunk`] | Recursive overlapping text splitter |
//! | [`embedding`] | Embedding trait, hashing embedder, vector utilities |
//! | [`store`] | Storage trait and in-memory backend |
//! | [`index`] | Vector index: embed, persist, search, filter |
//! | [`ingest`] | Chunk-and-index pipeline for one document |
//! | [`retrieval`] | Query-facing gateway with filter fallback |
//! | [`assemble`] | Budgeted, structure-preserving context sampling |
//! | [`strategy`] | Ordered fallback chain of context strategies |
//! | [`sizing`] | Output sizing helpers for generation callers |

pub mod assemble;
pub mod chunk;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod index;
pub mod ingest;
pub mod models;
pub mod retrieval;
pub mod sizing;
pub mod store;
pub mod strategy;

pub use assemble::{ContextAssembler, SamplingParams};
pub use error::IndexError;
pub use filter::ChunkFilter;
pub use index::VectorIndex;
pub use ingest::Ingestor;
pub use models::{Chunk, ChunkMetadata, ScoredChunk};
pub use retrieval::RetrievalGateway;
