//! File ingestion.
//!
//! Turns files on disk into indexed chunks:
//!
//! 1. Collect files: a single path as-is, or a directory walked with
//!    `walkdir` and filtered by `[ingest] include_globs`.
//! 2. Read each file as UTF-8 (invalid sequences replaced).
//! 3. Skip files whose trimmed text is shorter than `min_text_chars`.
//! 4. Name the source: `<stem>_<YYYYmmdd_HHMMSS><ext>` unless the caller
//!    keeps the original name or supplies an explicit source id. Files
//!    found under a directory fold their relative path into the name
//!    (`bio/notes.txt` becomes `bio_notes.txt`), and a name already
//!    claimed in the same batch gets a `-2`, `-3`, ... suffix on its stem.
//! 5. Chunk, embed, and index through the core [`Ingestor`].
//! 6. Optionally write `<source>.preview.json` into `preview_dir`. A
//!    preview failure is logged and does not undo or abort indexing.
//!
//! [`Ingestor`]: study_context_core::Ingestor

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::engine::Engine;

/// Per-file outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestStatus {
    Indexed { chunks: usize },
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub source_id: String,
    #[serde(flatten)]
    pub status: IngestStatus,
    /// Preview file written for this source, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Explicit source id. Only valid when ingesting a single file.
    pub source_id: Option<String>,
    /// Use the file name itself instead of a timestamped name.
    pub keep_name: bool,
}

/// Preview record written next to each ingested source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct Preview {
    pub source_file: String,
    pub preview: String,
    /// Character count of the full text.
    pub length: usize,
}

/// `<stem>_<YYYYmmdd_HHMMSS><ext>` for an uploaded file name.
pub fn stored_source_name(file_name: &str, at: NaiveDateTime) -> String {
    let (stem, ext) = split_extension(file_name);
    format!("{}_{}{}", stem, at.format("%Y%m%d_%H%M%S"), ext)
}

/// Name of `file` relative to `root` with directory components joined
/// by `_`: `bio/notes.txt` under `root` becomes `bio_notes.txt`.
pub fn relative_file_name(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        file.display().to_string()
    } else {
        parts.join("_")
    }
}

/// Claim `name` in `taken`, suffixing the stem with `-2`, `-3`, ... until
/// it is unused.
fn claim_unique(name: String, taken: &mut HashSet<String>) -> String {
    if taken.insert(name.clone()) {
        return name;
    }
    let (stem, ext) = split_extension(&name);
    let mut n = 2usize;
    loop {
        let candidate = format!("{}-{}{}", stem, n, ext);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// `("chapter.one", ".md")` for `chapter.one.md`; no extension gives `""`.
fn split_extension(file_name: &str) -> (String, String) {
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (stem, ext)
}

/// Ingest a file or every matching file under a directory.
///
/// Source ids are unique within one call even when files in different
/// subdirectories share a name.
pub async fn ingest_path(
    engine: &Engine,
    path: &Path,
    opts: &IngestOptions,
) -> Result<Vec<FileReport>> {
    if !path.exists() {
        bail!("Path does not exist: {}", path.display());
    }

    let (root, files) = if path.is_dir() {
        if opts.source_id.is_some() {
            bail!("--source-id applies to a single file, not a directory");
        }
        let files = collect_files(path, &engine.config().ingest.include_globs)?;
        (path, files)
    } else {
        (path.parent().unwrap_or(path), vec![path.to_path_buf()])
    };

    let now = chrono::Local::now().naive_local();
    let mut taken = HashSet::with_capacity(files.len());
    let mut reports = Vec::with_capacity(files.len());

    for file in files {
        let source_id = match &opts.source_id {
            Some(id) => id.clone(),
            None => {
                let name = relative_file_name(root, &file);
                let name = if opts.keep_name {
                    name
                } else {
                    stored_source_name(&name, now)
                };
                claim_unique(name, &mut taken)
            }
        };
        reports.push(ingest_file(engine, &file, source_id).await?);
    }

    let indexed = reports
        .iter()
        .filter(|r| matches!(r.status, IngestStatus::Indexed { .. }))
        .count();
    info!(
        path = %path.display(),
        files = reports.len(),
        indexed,
        skipped = reports.len() - indexed,
        "ingest complete"
    );
    Ok(reports)
}

async fn ingest_file(engine: &Engine, path: &Path, source_id: String) -> Result<FileReport> {
    let ingest_config = &engine.config().ingest;
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes);

    let trimmed_chars = text.trim().chars().count();
    if trimmed_chars < ingest_config.min_text_chars {
        warn!(
            path = %path.display(),
            chars = trimmed_chars,
            min = ingest_config.min_text_chars,
            "not enough text to index; skipping"
        );
        return Ok(FileReport {
            path: path.to_path_buf(),
            source_id,
            status: IngestStatus::Skipped {
                reason: format!(
                    "only {} characters of text (minimum {})",
                    trimmed_chars, ingest_config.min_text_chars
                ),
            },
            preview: None,
        });
    }

    let chunks = engine
        .ingestor()
        .ingest(&source_id, &text)
        .await
        .with_context(|| format!("Failed to index {}", path.display()))?;

    // The chunks are committed; a preview failure only loses the preview.
    let preview = match &ingest_config.preview_dir {
        Some(dir) => match write_preview(dir, &source_id, &text, ingest_config.preview_chars) {
            Ok(written) => Some(written),
            Err(err) => {
                warn!(
                    source_id = %source_id,
                    dir = %dir.display(),
                    error = %err,
                    "failed to write preview"
                );
                None
            }
        },
        None => None,
    };

    Ok(FileReport {
        path: path.to_path_buf(),
        source_id,
        status: IngestStatus::Indexed { chunks },
        preview,
    })
}

/// Build the preview record: the first `preview_chars` characters.
pub fn build_preview(source_file: &str, text: &str, preview_chars: usize) -> Preview {
    Preview {
        source_file: source_file.to_string(),
        preview: text.chars().take(preview_chars).collect(),
        length: text.chars().count(),
    }
}

/// `<source_id>.preview.json` with every character outside
/// `[A-Za-z0-9._-]` replaced by `_`, so the file always lands directly
/// inside the preview directory.
pub fn preview_file_name(source_id: &str) -> String {
    let safe: String = source_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}.preview.json", safe)
}

/// Write `<dir>/<preview_file_name(source_id)>` and return its path.
pub fn write_preview(
    dir: &Path,
    source_id: &str,
    text: &str,
    preview_chars: usize,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create preview directory: {}", dir.display()))?;
    let path = dir.join(preview_file_name(source_id));
    let json = serde_json::to_string_pretty(&build_preview(source_id, text, preview_chars))?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Files under `root` matching `include_globs`, sorted by path.
pub fn collect_files(root: &Path, include_globs: &[String]) -> Result<Vec<PathBuf>> {
    let include_set = build_globset(include_globs)?;
    let exclude_set = build_globset(&["**/.git/**".to_string(), "**/.*/**".to_string()])?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy();
        if exclude_set.is_match(rel_str.as_ref()) || !include_set.is_match(rel_str.as_ref()) {
            continue;
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap()
    }

    #[test]
    fn test_stored_source_name() {
        assert_eq!(stored_source_name("notes.txt", at()), "notes_20240309_140507.txt");
        assert_eq!(
            stored_source_name("chapter.one.md", at()),
            "chapter.one_20240309_140507.md"
        );
        assert_eq!(stored_source_name("README", at()), "README_20240309_140507");
    }

    #[test]
    fn test_build_preview_counts_chars() {
        let preview = build_preview("a.txt", "héllo world", 5);
        assert_eq!(preview.preview, "héllo");
        assert_eq!(preview.length, 11);
    }

    #[test]
    fn test_write_preview_shape() {
        let dir = tempfile::tempdir().unwrap();
        let source_id = "a_20240309_140507.txt";
        let path = write_preview(dir.path(), source_id, "abcdef", 3).unwrap();
        assert!(path.ends_with("a_20240309_140507.txt.preview.json"));
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "source_file": "a_20240309_140507.txt",
                "preview": "abc",
                "length": 6
            })
        );
    }

    #[test]
    fn test_collect_files_applies_globs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        std::fs::write(dir.path().join("sub/b.md"), "x").unwrap();
        std::fs::write(dir.path().join("c.bin"), "x").unwrap();
        std::fs::write(dir.path().join(".git/d.txt"), "x").unwrap();

        let globs = ["**/*.txt".to_string(), "**/*.md".to_string()];
        let files = collect_files(dir.path(), &globs).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| relative_file_name(dir.path(), p))
            .collect();
        assert_eq!(names, vec!["a.txt", "sub_b.md"]);
    }

    #[test]
    fn test_relative_file_name_folds_directories() {
        let root = Path::new("/data/docs");
        assert_eq!(
            relative_file_name(root, Path::new("/data/docs/bio/notes.txt")),
            "bio_notes.txt"
        );
        assert_eq!(
            relative_file_name(root, Path::new("/data/docs/notes.txt")),
            "notes.txt"
        );
        assert_eq!(relative_file_name(Path::new(""), Path::new("a.txt")), "a.txt");
    }

    #[test]
    fn test_claim_unique_suffixes_the_stem() {
        let mut taken = HashSet::new();
        assert_eq!(claim_unique("notes.txt".into(), &mut taken), "notes.txt");
        assert_eq!(claim_unique("notes.txt".into(), &mut taken), "notes-2.txt");
        assert_eq!(claim_unique("notes.txt".into(), &mut taken), "notes-3.txt");
        assert_eq!(claim_unique("README".into(), &mut taken), "README");
        assert_eq!(claim_unique("README".into(), &mut taken), "README-2");
    }

    #[test]
    fn test_preview_file_name_stays_inside_dir() {
        assert_eq!(preview_file_name("unit1/a.txt"), "unit1_a.txt.preview.json");
        assert_eq!(preview_file_name("../../etc"), ".._.._etc.preview.json");
        assert_eq!(preview_file_name("a\\b c.md"), "a_b_c.md.preview.json");

        let dir = tempfile::tempdir().unwrap();
        let path = write_preview(dir.path(), "unit1/a.txt", "text", 10).unwrap();
        assert_eq!(path.parent(), Some(dir.path()));
        let preview: Preview =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(preview.source_file, "unit1/a.txt");
    }

    #[test]
    fn test_report_serializes_flat() {
        let report = FileReport {
            path: PathBuf::from("a.txt"),
            source_id: "a.txt".into(),
            status: IngestStatus::Indexed { chunks: 4 },
            preview: None,
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({
                "path": "a.txt",
                "source_id": "a.txt",
                "status": "indexed",
                "chunks": 4
            })
        );
    }
}
