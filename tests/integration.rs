use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn study_ctx_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_study-ctx"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(
        files_dir.join("biology.md"),
        "# Cells\n\nCells are the basic unit of life.\n\nMitochondria produce energy for the cell.",
    )
    .unwrap();
    fs::write(
        files_dir.join("history.txt"),
        "The Roman Empire.\n\nRome was founded on seven hills.\n\nThe empire fell in 476.",
    )
    .unwrap();
    fs::write(files_dir.join("tiny.txt"), "  hi  ").unwrap();
    let image = files_dir.join("image.png");
    fs::write(image, [0u8, 1, 2, 3]).unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/study.sqlite"

[chunking]
chunk_size = 60
overlap = 10

[embedding]
provider = "hash"
dims = 128

[ingest]
preview_dir = "{root}/previews"
"#,
        root = root.display().to_string().replace('\\', "/")
    );

    let config_path = config_dir.join("study.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_study_ctx(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = study_ctx_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run study-ctx binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_init_is_idempotent() {
    let (tmp, config) = setup_test_env();
    let (stdout, stderr, ok) = run_study_ctx(&config, &["init"]);
    assert!(ok, "init failed: {}", stderr);
    assert!(stdout.contains("Database initialized successfully."));
    assert!(tmp.path().join("data/study.sqlite").exists());

    let (_, stderr, ok) = run_study_ctx(&config, &["init"]);
    assert!(ok, "second init failed: {}", stderr);
}

#[test]
fn test_ingest_directory_then_list_sources() {
    let (tmp, config) = setup_test_env();
    let files = tmp.path().join("files");

    let (stdout, stderr, ok) = run_study_ctx(
        &config,
        &["ingest", files.to_str().unwrap(), "--keep-name"],
    );
    assert!(ok, "ingest failed: {}", stderr);
    assert!(stdout.contains("indexed biology.md"), "stdout: {}", stdout);
    assert!(stdout.contains("indexed history.txt"), "stdout: {}", stdout);
    assert!(stdout.contains("skipped"), "tiny.txt should be skipped: {}", stdout);
    assert!(!stdout.contains("image.png"), "png is not in include_globs");

    let (stdout, _, ok) = run_study_ctx(&config, &["sources"]);
    assert!(ok);
    assert!(stdout.contains("biology.md"));
    assert!(stdout.contains("history.txt"));
    assert!(!stdout.contains("tiny.txt"));

    let preview = tmp.path().join("previews/biology.md.preview.json");
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(preview).unwrap()).unwrap();
    assert_eq!(json["source_file"], "biology.md");
    assert!(json["length"].as_u64().unwrap() > 0);
}

#[test]
fn test_ingest_file_uses_timestamped_name() {
    let (tmp, config) = setup_test_env();
    let file = tmp.path().join("files/history.txt");

    let (stdout, stderr, ok) = run_study_ctx(&config, &["ingest", file.to_str().unwrap()]);
    assert!(ok, "ingest failed: {}", stderr);
    let line = stdout.lines().next().unwrap();
    assert!(line.starts_with("indexed history_"), "line: {}", line);
    assert!(line.contains(".txt ("), "line: {}", line);
}

#[test]
fn test_source_id_rejected_for_directory() {
    let (tmp, config) = setup_test_env();
    let files = tmp.path().join("files");
    let (_, stderr, ok) = run_study_ctx(
        &config,
        &["ingest", files.to_str().unwrap(), "--source-id", "x"],
    );
    assert!(!ok);
    assert!(stderr.contains("--source-id"));
}

#[test]
fn test_search_with_source_filter_and_fallback() {
    let (tmp, config) = setup_test_env();
    let files = tmp.path().join("files");
    run_study_ctx(&config, &["ingest", files.to_str().unwrap(), "--keep-name"]);

    let (stdout, stderr, ok) = run_study_ctx(
        &config,
        &["search", "mitochondria energy", "--k", "1", "--json"],
    );
    assert!(ok, "search failed: {}", stderr);
    let hits: Vec<serde_json::Value> = serde_json::from_str(&stdout).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["source"], "biology.md");

    let (stdout, _, ok) = run_study_ctx(
        &config,
        &["search", "empire", "--source", "history.txt", "--json"],
    );
    assert!(ok);
    let hits: Vec<serde_json::Value> = serde_json::from_str(&stdout).unwrap();
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|h| h["source"] == "history.txt"));

    // Unknown source widens to the whole index.
    let (stdout, _, ok) = run_study_ctx(
        &config,
        &["search", "empire", "--source", "missing.txt", "--json"],
    );
    assert!(ok);
    let hits: Vec<serde_json::Value> = serde_json::from_str(&stdout).unwrap();
    assert!(!hits.is_empty());
}

#[test]
fn test_context_preserves_document_order() {
    let (tmp, config) = setup_test_env();
    let file = tmp.path().join("files/history.txt");
    run_study_ctx(
        &config,
        &["ingest", file.to_str().unwrap(), "--source-id", "rome"],
    );

    let (stdout, stderr, ok) = run_study_ctx(&config, &["context", "rome"]);
    assert!(ok, "context failed: {}", stderr);
    let first = stdout.find("The Roman Empire.").unwrap();
    let last = stdout.find("The empire fell in 476.").unwrap();
    assert!(first < last);

    let (stdout, _, ok) = run_study_ctx(&config, &["context", "unknown-source"]);
    assert!(ok);
    assert_eq!(stdout.trim(), "");

    let (stdout, _, ok) = run_study_ctx(
        &config,
        &["context", "unknown-source", "--query", "seven hills"],
    );
    assert!(ok);
    assert!(stdout.contains("[Source: rome]"), "stdout: {}", stdout);
}

#[test]
fn test_context_json_reports_sizing_targets() {
    let (tmp, config) = setup_test_env();
    let file = tmp.path().join("files/history.txt");
    run_study_ctx(
        &config,
        &["ingest", file.to_str().unwrap(), "--source-id", "rome"],
    );

    let (stdout, stderr, ok) = run_study_ctx(&config, &["context", "rome", "--json"]);
    assert!(ok, "context failed: {}", stderr);
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["source_id"], "rome");
    assert_eq!(report["selected"], "assembled-document");
    let text = report["text"].as_str().unwrap();
    assert!(text.starts_with("The Roman Empire."));
    assert_eq!(report["chars"], text.chars().count());
    assert_eq!(report["summary"]["words"], "50-100");
    assert_eq!(report["summary"]["key_points"], "2-3");
    assert_eq!(report["quiz_questions"], 10);

    let (stdout, _, ok) = run_study_ctx(&config, &["context", "unknown-source", "--json"]);
    assert!(ok);
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(report["selected"].is_null());
    assert_eq!(report["chars"], 0);
    assert_eq!(report["text"], "");
}

#[test]
fn test_ingest_nested_directories_keeps_names_distinct() {
    let (tmp, config) = setup_test_env();
    let docs = tmp.path().join("docs");
    fs::create_dir_all(docs.join("bio")).unwrap();
    fs::create_dir_all(docs.join("hist")).unwrap();
    fs::write(docs.join("bio/notes.txt"), "Cells divide by mitosis.").unwrap();
    fs::write(docs.join("hist/notes.txt"), "Rome fell in 476.").unwrap();

    let (stdout, stderr, ok) = run_study_ctx(
        &config,
        &["ingest", docs.to_str().unwrap(), "--keep-name"],
    );
    assert!(ok, "ingest failed: {}", stderr);
    assert!(stdout.contains("indexed bio_notes.txt"), "stdout: {}", stdout);
    assert!(stdout.contains("indexed hist_notes.txt"), "stdout: {}", stdout);
    assert!(tmp.path().join("previews/bio_notes.txt.preview.json").exists());
    assert!(tmp.path().join("previews/hist_notes.txt.preview.json").exists());
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, ok) = run_study_ctx(&tmp.path().join("nope.toml"), &["init"]);
    assert!(!ok);
    assert!(stderr.contains("Failed to read config file"));
}
