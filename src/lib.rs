//! # Study Context
//!
//! Document ingestion, semantic retrieval, and budgeted context assembly
//! for study tools (chat, quizzes, homework help).
//!
//! The algorithms live in [`study_context_core`]; this crate supplies the
//! SQLite store, embedding providers, file ingestion, configuration, and
//! the `study-ctx` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────┐
//! │ Files / dir │──▶│ Chunk+Embed  │──▶│  SQLite  │
//! │ (ingest)    │   │ (Ingestor)   │   │  chunks  │
//! └─────────────┘   └──────────────┘   └────┬─────┘
//!                                           │
//!                     ┌─────────────────────┤
//!                     ▼                     ▼
//!              ┌────────────┐       ┌──────────────┐
//!              │ Retrieval  │       │  Context     │
//!              │ Gateway    │       │  Assembler   │
//!              └────────────┘       └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! study-ctx init
//! study-ctx ingest ./notes/lecture1.txt
//! study-ctx search "photosynthesis" --k 3
//! study-ctx context lecture1_20240309_140507.txt --max-chars 2000
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite `ChunkStore` backend |
//! | [`embedding`] | Embedding providers |
//! | [`engine`] | Wires index, ingestor, gateway, assembler |
//! | [`ingest`] | File and directory ingestion, previews |
//! | [`logging`] | `tracing` subscriber setup |

pub mod config;
pub mod db;
pub mod embedding;
pub mod engine;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod sqlite_store;

