use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn rrag_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("rrag");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let ana = root.join("data/Ana");
    let luis = root.join("data/Luis");
    let eva = root.join("data/Eva");
    fs::create_dir_all(&ana).unwrap();
    fs::create_dir_all(&luis).unwrap();
    fs::create_dir_all(&eva).unwrap();
    fs::write(
        ana.join("cv.txt"),
        "Ana Perez. Backend engineer. Ana has 5 years of experience building payment APIs in Rust.",
    )
    .unwrap();
    fs::write(
        ana.join("skills.md"),
        "# Skills\n\nRust, PostgreSQL, Kubernetes.",
    )
    .unwrap();
    fs::write(
        luis.join("cv.md"),
        "# Luis Gomez\n\nData scientist. Luis studied statistics and works with Python.",
    )
    .unwrap();
    // Eva has a directory but nothing usable in it.
    fs::write(eva.join("notes.txt"), "   \n\n").unwrap();

    fs::write(
        config_dir.join("people.json"),
        r#"{
  "default_student": "Ana",
  "people": [
    {"name": "Ana", "aliases": ["ana", "ana perez"]},
    {"name": "Luis", "aliases": ["lucho"]},
    {"name": "Eva", "aliases": []}
  ]
}"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[paths]
data_dir = "{root}/data"
storage_dir = "{root}/storage"
registry = "{root}/config/people.json"

[chunking]
chunk_size = 200
overlap = 30

[embedding]
provider = "hash"
dims = 128
"#,
        root = root.display()
    );

    let config_path = config_dir.join("rag.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_rrag(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = rrag_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("OLLAMA_MODEL")
        .env_remove("OPENAI_API_KEY")
        .env_remove("ANTHROPIC_API_KEY")
        .env_remove("EMBEDDING_PROVIDER")
        .env_remove("EMBEDDING_MODEL")
        .env_remove("TOP_K")
        .env_remove("RAG_DATA_DIR")
        .env_remove("RAG_STORAGE_DIR")
        .env_remove("RAG_REGISTRY")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run rrag binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_build_people_reports_each_person() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_rrag(&config_path, &["build", "--people"]);
    assert!(success, "build failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Ana: 2 documents"), "got: {}", stdout);
    assert!(stdout.contains("Luis: 1 documents"), "got: {}", stdout);
    assert!(stdout.contains("Eva: skipped"), "got: {}", stdout);
    assert!(stdout.contains("built: 2, skipped: 1"));

    let storage = tmp.path().join("storage");
    assert!(storage.join("Ana/index.bin").exists());
    assert!(storage.join("Ana/meta.json").exists());
    assert!(!storage.join("Eva").exists());
}

#[test]
fn test_build_global() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_rrag(&config_path, &["build"]);
    assert!(success, "build failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("documents: 3"), "got: {}", stdout);
    assert!(stdout.contains("dim: 128"));
    assert!(tmp.path().join("storage/index.bin").exists());
}

#[test]
fn test_build_single_person() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_rrag(&config_path, &["build", "--person", "Luis"]);
    assert!(success);
    assert!(stdout.contains("Luis: 1 documents"));
    assert!(tmp.path().join("storage/Luis/index.bin").exists());
    assert!(!tmp.path().join("storage/Ana").exists());
}

#[test]
fn test_search_person_returns_hits() {
    let (_tmp, config_path) = setup_test_env();

    run_rrag(&config_path, &["build", "--people"]);
    let (stdout, stderr, success) = run_rrag(
        &config_path,
        &["search", "years of experience", "--person", "Ana"],
    );
    assert!(success, "search failed: {}", stderr);
    assert!(stdout.contains("5 years of experience"), "got: {}", stdout);
    assert!(stdout.contains("cv.txt"));
}

#[test]
fn test_search_without_index_names_builder() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_rrag(&config_path, &["search", "anything", "--person", "Luis"]);
    assert!(!success);
    assert!(
        stderr.contains("rrag build --person Luis"),
        "expected remediation hint, got: {}",
        stderr
    );
}

#[test]
fn test_resolve_uses_aliases_and_default() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_rrag(&config_path, &["resolve", "What did LUCHO study?"]);
    assert!(success);
    assert_eq!(stdout.trim(), "Luis");

    let (stdout, _, _) = run_rrag(&config_path, &["resolve", "who knows Kubernetes?"]);
    assert_eq!(stdout.trim(), "Ana");
}

#[test]
fn test_people_lists_registry() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_rrag(&config_path, &["people"]);
    assert!(success);
    assert!(stdout.contains("Ana\nLuis\nEva\n"));
    assert!(stdout.contains("default: Ana"));
}

#[test]
fn test_ask_without_provider_fails_clearly() {
    let (_tmp, config_path) = setup_test_env();

    run_rrag(&config_path, &["build", "--people"]);
    let (_, stderr, success) = run_rrag(&config_path, &["ask", "How much experience does Ana have?"]);
    assert!(!success);
    assert!(stderr.contains("OLLAMA_MODEL"), "got: {}", stderr);
}

#[test]
fn test_stats_after_build() {
    let (_tmp, config_path) = setup_test_env();

    run_rrag(&config_path, &["build", "--people"]);
    let (stdout, _, success) = run_rrag(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("global"));
    assert!(stdout.contains("not built"));
    assert!(stdout.contains("Ana"));
    assert!(stdout.contains("hash-128"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_tmp, config_path) = setup_test_env();
    fs::write(&config_path, "[retrieval]\ntop_k = 0\n").unwrap();

    let (_, stderr, success) = run_rrag(&config_path, &["stats"]);
    assert!(!success);
    assert!(stderr.contains("top_k"), "got: {}", stderr);
}
