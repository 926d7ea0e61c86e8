//! # Study Context CLI (`study-ctx`)
//!
//! ## Usage
//!
//! ```bash
//! study-ctx --config ./config/study.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `study-ctx init` | Create the SQLite database and schema |
//! | `study-ctx ingest <path>` | Chunk, embed, and index a file or directory |
//! | `study-ctx search "<query>"` | Top-k chunks by semantic similarity |
//! | `study-ctx context <source>` | Budgeted, order-preserving document window |
//! | `study-ctx context <source> --json` | Window plus summary and quiz sizing targets |
//! | `study-ctx sources` | Indexed sources with chunk counts |
//!
//! Logs go to stderr; stdout carries only command output.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use study_context::config;
use study_context::engine::Engine;
use study_context::ingest::{self, IngestOptions, IngestStatus};
use study_context::logging;
use study_context_core::sizing::{self, SummaryTargets};
use study_context_core::strategy::{AssembledDocument, ContextRequest};
use study_context_core::ChunkFilter;

/// Study Context CLI: ingest study material and assemble context for
/// document-grounded generation.
#[derive(Parser)]
#[command(
    name = "study-ctx",
    about = "Study Context: document ingestion, semantic retrieval, and budgeted context assembly",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/study.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and schema. Safe to run repeatedly.
    Init,

    /// Ingest a file, or every matching file under a directory.
    ///
    /// Each file becomes one source. By default the source id is the
    /// file name with an ingestion timestamp, e.g.
    /// `notes_20240309_140507.txt`.
    Ingest {
        path: PathBuf,

        /// Explicit source id (single file only).
        #[arg(long)]
        source_id: Option<String>,

        /// Use the plain file name as the source id.
        #[arg(long)]
        keep_name: bool,
    },

    /// Retrieve the chunks most relevant to a query.
    Search {
        query: String,

        /// Number of chunks to return (default: `[retrieval] default_k`).
        #[arg(long)]
        k: Option<usize>,

        /// Restrict to one source; widened to all sources when it has no match.
        #[arg(long)]
        source: Option<String>,

        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Print a budgeted context window for one source.
    ///
    /// With `--query`, falls back to ranked retrieval when the source
    /// yields nothing.
    Context {
        source_id: String,

        /// Character budget (default: `[assembler] max_chars`).
        #[arg(long)]
        max_chars: Option<usize>,

        /// Query for the retrieval fallback.
        #[arg(long)]
        query: Option<String>,

        /// Emit JSON with the window and its sizing targets.
        #[arg(long)]
        json: bool,
    },

    /// List indexed sources and their chunk counts.
    Sources,
}

#[derive(Serialize)]
struct SearchHit<'a> {
    source: &'a str,
    chunk_index: usize,
    text: &'a str,
}

#[derive(Serialize)]
struct ContextReport<'a> {
    source_id: &'a str,
    /// Strategy that produced the text; `None` when nothing was found.
    selected: Option<&'a str>,
    chars: usize,
    summary: SummaryTargets,
    quiz_questions: usize,
    text: &'a str,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    logging::init_tracing(&cfg.logging.level);

    let engine = Engine::open(cfg).await?;

    match cli.command {
        Commands::Init => {
            println!("Database initialized successfully.");
        }
        Commands::Ingest {
            path,
            source_id,
            keep_name,
        } => {
            let opts = IngestOptions {
                source_id,
                keep_name,
            };
            let reports = ingest::ingest_path(&engine, &path, &opts).await?;
            for report in &reports {
                match &report.status {
                    IngestStatus::Indexed { chunks } => {
                        println!("indexed {} ({} chunks)", report.source_id, chunks)
                    }
                    IngestStatus::Skipped { reason } => {
                        println!("skipped {}: {}", report.path.display(), reason)
                    }
                }
            }
        }
        Commands::Search {
            query,
            k,
            source,
            json,
        } => {
            let k = k.unwrap_or(engine.config().retrieval.default_k);
            let filter = source.map(ChunkFilter::Source);
            let chunks = engine.gateway().retrieve(&query, k, filter.as_ref()).await?;

            if json {
                let hits: Vec<SearchHit> = chunks
                    .iter()
                    .map(|c| SearchHit {
                        source: &c.source_id,
                        chunk_index: c.chunk_index,
                        text: &c.text,
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else if chunks.is_empty() {
                println!("No results.");
            } else {
                for (i, chunk) in chunks.iter().enumerate() {
                    println!("{}. {} #{}", i + 1, chunk.source_id, chunk.chunk_index);
                    println!("{}", chunk.text);
                    println!();
                }
            }
        }
        Commands::Context {
            source_id,
            max_chars,
            query,
            json,
        } => {
            let max_chars = max_chars.unwrap_or(engine.config().assembler.max_chars);
            let (selected, text) = match query {
                None => {
                    let text = engine
                        .assembler()
                        .try_assemble(&source_id, max_chars)
                        .await?;
                    let selected =
                        (!text.is_empty()).then(|| AssembledDocument::NAME.to_string());
                    (selected, text)
                }
                Some(query) => {
                    let report = engine
                        .build_context(&ContextRequest {
                            source_id: Some(source_id.clone()),
                            query: Some(query),
                            raw_text: None,
                            max_chars,
                            k: engine.config().retrieval.default_k,
                        })
                        .await;
                    info!(selected = ?report.selected, "context built");
                    (report.selected, report.text)
                }
            };

            if json {
                let chars = text.chars().count();
                let report = ContextReport {
                    source_id: &source_id,
                    selected: selected.as_deref(),
                    chars,
                    summary: sizing::summary_targets(&text),
                    quiz_questions: sizing::quiz_question_target(chars),
                    text: &text,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", text);
            }
        }
        Commands::Sources => {
            let sources = engine.index().sources().await?;
            if sources.is_empty() {
                println!("No sources.");
            } else {
                println!("{:<48} CHUNKS", "SOURCE");
                for s in sources {
                    println!("{:<48} {}", s.source_id, s.chunk_count);
                }
            }
        }
    }

    Ok(())
}
