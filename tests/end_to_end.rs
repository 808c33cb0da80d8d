//! Black-box scenarios mirroring the concrete end-to-end cases used to validate
//! ingestion, indexing, freshness, and query behavior together.

use std::fs;
use std::path::Path;

use archivist::config::ArchivistConfig;
use archivist::engine::SearchEngine;
use archivist::indexer::BuildOptions;
use archivist::query::QueryOptions;
use archivist::ArchivistError;
use tempfile::TempDir;

fn write_session(dir: &Path, project: &str, id: &str, body: &str) {
    let proj_dir = dir.join(project);
    fs::create_dir_all(&proj_dir).unwrap();
    fs::write(proj_dir.join(format!("{id}.jsonl")), body).unwrap();
}

fn config_for(sessions: &TempDir, export: &TempDir) -> ArchivistConfig {
    let mut cfg = ArchivistConfig::default();
    cfg.sessions_dir = sessions.path().to_string_lossy().to_string();
    cfg.export_dir = export.path().to_string_lossy().to_string();
    cfg
}

#[test]
fn s1_single_document_exact_hit() {
    let sessions = TempDir::new().unwrap();
    let export = TempDir::new().unwrap();
    write_session(
        sessions.path(),
        "p1",
        "aaaaaaaa-aaaa-4aaa-aaaa-aaaaaaaaaaaa",
        r#"{"type":"user","sessionId":"s1","message":{"role":"user","content":"hello world javascript debugging session"}}"#,
    );

    let mut engine = SearchEngine::new(config_for(&sessions, &export));
    engine.build(BuildOptions::default()).unwrap();

    let response = engine.search("javascript", QueryOptions::default()).unwrap();
    assert_eq!(response.results.len(), 1);
    assert!(response.results[0].score > 0.1);
    assert!(response.results[0].preview.contains("[HIGHLIGHT]javascript[/HIGHLIGHT]"));
    assert_eq!(response.results[0].occurrences.len(), 1);
}

#[test]
fn s2_prefix_expansion() {
    let sessions = TempDir::new().unwrap();
    let export = TempDir::new().unwrap();
    write_session(
        sessions.path(),
        "p1",
        "bbbbbbbb-bbbb-4bbb-bbbb-bbbbbbbbbbbb",
        r#"{"type":"user","sessionId":"s1","message":{"role":"user","content":"learning javascript and javabeans"}}"#,
    );

    let mut engine = SearchEngine::new(config_for(&sessions, &export));
    engine.build(BuildOptions::default()).unwrap();

    let response = engine.search("java", QueryOptions::default()).unwrap();
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].occurrences.len(), 2);
    assert_eq!(response.results[0].current_occurrence_index, 0);
}

#[test]
fn s3_and_semantics() {
    let sessions = TempDir::new().unwrap();
    let export = TempDir::new().unwrap();
    write_session(
        sessions.path(),
        "p1",
        "cccccccc-cccc-4ccc-cccc-cccccccccccc",
        r#"{"type":"user","sessionId":"s1","message":{"role":"user","content":"apples and bananas"}}"#,
    );
    write_session(
        sessions.path(),
        "p1",
        "dddddddd-dddd-4ddd-dddd-dddddddddddd",
        r#"{"type":"user","sessionId":"s2","message":{"role":"user","content":"apples and oranges"}}"#,
    );

    let mut engine = SearchEngine::new(config_for(&sessions, &export));
    engine.build(BuildOptions::default()).unwrap();

    let response = engine.search("apples oranges", QueryOptions::default()).unwrap();
    assert_eq!(response.results.len(), 1);
    assert!(response.results[0].preview.contains("oranges") || response.results[0].occurrences.iter().any(|o| o.query_word == "oranges"));
}

#[test]
fn s4_empty_conversation_skipped() {
    let sessions = TempDir::new().unwrap();
    let export = TempDir::new().unwrap();
    write_session(
        sessions.path(),
        "p1",
        "eeeeeeee-eeee-4eee-eeee-eeeeeeeeeeee",
        r#"{"type":"meta","sessionId":"s1"}"#,
    );

    let mut engine = SearchEngine::new(config_for(&sessions, &export));
    let report = engine.build(BuildOptions::default()).unwrap();
    assert_eq!(report.documents, 0);
    assert_eq!(report.skipped_empty, 1);
}

#[test]
fn s5_freshness_archive_protects_larger_index() {
    let sessions = TempDir::new().unwrap();
    let export = TempDir::new().unwrap();
    for i in 0..5 {
        write_session(
            sessions.path(),
            "p1",
            &format!("ffffffff-ffff-4fff-ffff-ffffffffff{i:02}"),
            r#"{"type":"user","sessionId":"s1","message":{"role":"user","content":"hello world"}}"#,
        );
    }

    let cfg = config_for(&sessions, &export);
    let mut engine = SearchEngine::new(cfg.clone());
    engine.build(BuildOptions::default()).unwrap();

    // Rotate away all but one session file.
    for entry in fs::read_dir(sessions.path().join("p1")).unwrap() {
        let entry = entry.unwrap();
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.starts_with("ffffffff-ffff-4fff-ffff-ffffffffff00") {
            fs::remove_file(entry.path()).unwrap();
        }
    }

    let mut fresh_engine = SearchEngine::new(cfg);
    assert_eq!(fresh_engine.freshness(), archivist::freshness::Freshness::Archive);
    let response = fresh_engine.search("hello", QueryOptions::default()).unwrap();
    assert!(!response.results.is_empty());
}

#[test]
fn s6_corruption_recovery() {
    let sessions = TempDir::new().unwrap();
    let export = TempDir::new().unwrap();
    write_session(
        sessions.path(),
        "p1",
        "12345678-1234-4123-8123-123456789012",
        r#"{"type":"user","sessionId":"s1","message":{"role":"user","content":"hello world"}}"#,
    );

    let cfg = config_for(&sessions, &export);
    let mut engine = SearchEngine::new(cfg.clone());
    engine.build(BuildOptions::default()).unwrap();

    fs::write(cfg.resolved_index_path(), "corrupt").unwrap();

    let mut broken_engine = SearchEngine::new(cfg.clone());
    let err = broken_engine.search("hello", QueryOptions::default()).unwrap_err();
    assert!(matches!(err, ArchivistError::IndexCorrupt { .. }));

    let mut rebuilding_engine = SearchEngine::new(cfg);
    rebuilding_engine.build(BuildOptions { force: true }).unwrap();
    let response = rebuilding_engine.search("hello", QueryOptions::default()).unwrap();
    assert!(!response.results.is_empty());
}
