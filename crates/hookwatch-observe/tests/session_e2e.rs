//! End-to-end tests for the execution log pipeline
//!
//! Tests the full flow against a real log directory:
//! 1. Emit events for a session (session log, severity logs, ring buffer)
//! 2. A blocking decision opens a capture window
//! 3. The context record lands on disk and parses back
//! 4. The janitor compresses and prunes what it should

use hookwatch_config::ObserveConfig;
use hookwatch_observe::{
    janitor, read_context_record, EmitOptions, ExecutionObserver, LogEvent, Severity,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;

fn observer_with_window(dir: &TempDir, after_window: usize) -> ExecutionObserver {
    let mut config = ObserveConfig::with_log_dir(dir.path());
    config.after_window = after_window;
    ExecutionObserver::new(config)
}

fn context_files(dir: &TempDir) -> Vec<PathBuf> {
    let context_dir = dir.path().join("error-context");
    if !context_dir.exists() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(context_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    files.sort();
    files
}

fn hook_names(events: &[LogEvent]) -> Vec<&str> {
    events.iter().map(|e| e.hook_name.as_str()).collect()
}

#[tokio::test]
async fn test_block_captures_surrounding_events() {
    let dir = TempDir::new().unwrap();
    let mut observer = observer_with_window(&dir, 3);
    let s1 = || EmitOptions::session("s1");

    observer.emit("A", "approve", None, None, s1()).await;
    let blocked = observer
        .emit("B", "block", Some("dangerous command"), None, s1())
        .await;
    assert_eq!(blocked.severity, Severity::Error);
    assert!(context_files(&dir).is_empty());

    observer.emit("C", "approve", None, None, s1()).await;
    observer.emit("D", "approve", None, None, s1()).await;
    let last = observer.emit("E", "approve", None, None, s1()).await;

    let files = context_files(&dir);
    assert_eq!(files.len(), 1);
    assert_eq!(last.context_saved.as_ref(), Some(&files[0]));

    let record = read_context_record(&files[0]).await.unwrap();
    assert_eq!(hook_names(&record.before), vec!["A"]);
    assert_eq!(record.error, blocked.event);
    assert_eq!(hook_names(&record.after), vec!["C", "D", "E"]);
    assert_eq!(record.metadata.session_id, "s1");
    assert_eq!(record.metadata.before_count, 1);
    assert_eq!(record.metadata.after_count, 3);

    // The window is closed; more events do not produce another record
    observer.emit("F", "approve", None, None, s1()).await;
    assert_eq!(context_files(&dir).len(), 1);
}

#[tokio::test]
async fn test_session_teardown_flushes_partial_capture() {
    let dir = TempDir::new().unwrap();
    let mut observer = observer_with_window(&dir, 5);
    let s1 = || EmitOptions::session("s1");

    observer.emit("A", "approve", None, None, s1()).await;
    observer.emit("B", "deny", None, None, s1()).await;
    observer.emit("C", "approve", None, None, s1()).await;

    let path = observer.flush_pending("s1").await.unwrap();
    observer.clear_session("s1");

    let record = read_context_record(&path).await.unwrap();
    assert_eq!(hook_names(&record.before), vec!["A"]);
    assert_eq!(record.error.hook_name, "B");
    assert_eq!(hook_names(&record.after), vec!["C"]);
    assert_eq!(observer.capturer().buffers().session_count(), 0);
}

#[tokio::test]
async fn test_logs_are_split_by_session_and_severity() {
    let dir = TempDir::new().unwrap();
    let mut observer = observer_with_window(&dir, 5);

    observer
        .emit("A", "approve", None, None, EmitOptions::session("s1"))
        .await;
    observer
        .emit("B", "warn", None, Some(json!({"path": "/etc"})), EmitOptions::session("s2"))
        .await;
    observer
        .emit("C", "block", None, None, EmitOptions::session("s1"))
        .await;
    observer
        .emit("D", "approve", None, None, EmitOptions::default())
        .await;

    assert_eq!(hook_names(&observer.read_session("s1").await), vec!["A", "C"]);
    assert_eq!(hook_names(&observer.read_session("s2").await), vec!["B"]);
    assert!(observer.read_session("s3").await.is_empty());

    let all = observer.read_all_sessions().await;
    let names: Vec<&str> = all.iter().map(|r| r["hookName"].as_str().unwrap()).collect();
    assert_eq!(names.len(), 3);
    assert!(!names.contains(&"D"));

    let errors = std::fs::read_to_string(dir.path().join("hook-errors.log")).unwrap();
    let warnings = std::fs::read_to_string(dir.path().join("hook-warnings.log")).unwrap();
    assert_eq!(errors.lines().count(), 1);
    assert_eq!(warnings.lines().count(), 1);
    let warning: Value = serde_json::from_str(warnings.trim()).unwrap();
    assert_eq!(warning["severity"], "WARN");
    assert_eq!(warning["details"]["path"], "/etc");
    assert!(!dir.path().join("hook-debug.log").exists());
}

#[tokio::test]
async fn test_traversal_session_id_stays_in_log_dir() {
    let dir = TempDir::new().unwrap();
    let logs = dir.path().join("logs");
    let mut observer = ExecutionObserver::new(ObserveConfig::with_log_dir(&logs));

    let outcome = observer
        .emit("A", "approve", None, None, EmitOptions::session("../../escape"))
        .await;

    assert!(outcome.session_logged);
    assert!(logs.join("hook-execution-escape.jsonl").exists());
    assert!(!dir.path().join("escape").exists());
}

#[tokio::test]
async fn test_janitor_cleans_up_artifacts() {
    let dir = TempDir::new().unwrap();
    let mut observer = observer_with_window(&dir, 1);
    observer
        .emit("B", "block", None, None, EmitOptions::session("s1"))
        .await;
    observer
        .emit("C", "approve", None, None, EmitOptions::session("s1"))
        .await;
    let record = context_files(&dir).pop().unwrap();

    std::fs::rename(
        dir.path().join("hook-errors.log"),
        dir.path().join("hook-errors.log.1"),
    )
    .unwrap();

    let report = janitor::run_maintenance(observer.config()).await;
    assert_eq!(report.compression.compressed.len(), 1);
    assert!(dir.path().join("hook-errors.log.1.gz").exists());
    assert!(!dir.path().join("hook-errors.log.1").exists());
    // A fresh record is within retention
    assert_eq!(report.prune.retained, 1);
    assert!(record.exists());
}
