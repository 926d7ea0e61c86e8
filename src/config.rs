//! TOML configuration.
//!
//! Only `[db]` is required; every other section falls back to defaults.
//! [`load_config`] parses and validates the file; invalid values fail
//! fast with the offending key named in the error.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use study_context_core::chunk::ChunkingParams;
use study_context_core::SamplingParams;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub assembler: AssemblerConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

impl ChunkingConfig {
    pub fn params(&self) -> ChunkingParams {
        ChunkingParams {
            chunk_size: self.chunk_size,
            overlap: self.overlap,
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub default_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: default_k(),
        }
    }
}

fn default_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssemblerConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_head_fraction")]
    pub head_fraction: f64,
    #[serde(default = "default_tail_fraction")]
    pub tail_fraction: f64,
    #[serde(default = "default_capacity_bias")]
    pub capacity_bias: usize,
    #[serde(default)]
    pub strict_budget: bool,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            head_fraction: default_head_fraction(),
            tail_fraction: default_tail_fraction(),
            capacity_bias: default_capacity_bias(),
            strict_budget: false,
        }
    }
}

impl AssemblerConfig {
    pub fn sampling(&self) -> SamplingParams {
        SamplingParams {
            head_fraction: self.head_fraction,
            tail_fraction: self.tail_fraction,
            capacity_bias: self.capacity_bias,
            strict_budget: self.strict_budget,
        }
    }
}

fn default_max_chars() -> usize {
    25_000
}
fn default_head_fraction() -> f64 {
    0.20
}
fn default_tail_fraction() -> f64 {
    0.10
}
fn default_capacity_bias() -> usize {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "hash".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Files whose trimmed text is shorter than this are skipped.
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,
    /// Directory for `<stored name>.preview.json` files; none when unset.
    #[serde(default)]
    pub preview_dir: Option<PathBuf>,
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
    /// Globs (relative to the walked directory) selecting files to ingest.
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            min_text_chars: default_min_text_chars(),
            preview_dir: None,
            preview_chars: default_preview_chars(),
            include_globs: default_include_globs(),
        }
    }
}

fn default_min_text_chars() -> usize {
    10
}
fn default_preview_chars() -> usize {
    2000
}
fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.txt".to_string(),
        "**/*.md".to_string(),
        "**/*.csv".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Chunking
    if config.chunking.chunk_size == 0 {
        bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        bail!("chunking.overlap must be < chunking.chunk_size");
    }

    // Retrieval
    if config.retrieval.default_k == 0 {
        bail!("retrieval.default_k must be > 0");
    }

    // Assembler
    let a = &config.assembler;
    if !(0.0..=1.0).contains(&a.head_fraction) {
        bail!("assembler.head_fraction must be in [0.0, 1.0]");
    }
    if !(0.0..=1.0).contains(&a.tail_fraction) {
        bail!("assembler.tail_fraction must be in [0.0, 1.0]");
    }
    if a.head_fraction + a.tail_fraction > 1.0 {
        bail!("assembler.head_fraction + assembler.tail_fraction must be <= 1.0");
    }

    // Embedding
    let e = &config.embedding;
    if e.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }
    if e.dims == Some(0) {
        bail!("embedding.dims must be > 0");
    }
    match e.provider.as_str() {
        "hash" | "local" => {}
        "openai" | "ollama" => {
            if e.model.is_none() {
                bail!(
                    "embedding.model must be specified when provider is '{}'",
                    e.provider
                );
            }
            if e.dims.is_none() {
                bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    e.provider
                );
            }
        }
        other => bail!(
            "Unknown embedding provider: '{}'. Must be hash, openai, ollama, or local.",
            other
        ),
    }

    Ok(config)
}
