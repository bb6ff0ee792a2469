//! Integration tests for the process-pool worker binary.

use std::io::Write;
use std::process::{Command, Output, Stdio};
use term_judge::core::{ErrorReport, ExecArgs, DUMMY_LIBRARY};
use term_judge::prelude::*;
use term_judge::runner::PluginTask;

fn run_worker(input: &[u8]) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_term-judge-worker"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(input).unwrap();
    child.wait_with_output().unwrap()
}

fn dummy_task(operation: Operation) -> PluginTask {
    PluginTask {
        operation,
        library: DUMMY_LIBRARY.to_string(),
        exec_args: ExecArgs::new(),
        stores: vec![StoreConfig::local("local", "/data")],
        resources: vec![DataResource::new("orders", "orders.csv", "local")],
        constraints: None,
        error_report: None,
    }
}

#[test]
fn test_worker_returns_bundle_on_stdout() {
    let payload = serde_json::to_vec(&dummy_task(Operation::Profiling)).unwrap();
    let output = run_worker(&payload);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let bundle: Bundle = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(bundle.wrapped.status, ExecStatus::Finished);
    assert_eq!(bundle.library.library_name, DUMMY_LIBRARY);
    assert!(bundle.report.artifact.unwrap().as_profile().is_some());
}

#[test]
fn test_worker_runs_datafusion_validation() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("orders.csv"), "id,amount\n1,5\n2,7\n").unwrap();

    let constraint = Constraint::new("positive", "datafusion", ["orders"])
        .with_field("query", "SELECT MIN(amount) FROM orders")
        .with_field("check", "value")
        .with_field("expect", "minimum")
        .with_field("value", 1);
    let task = PluginTask {
        operation: Operation::Validation,
        library: "datafusion".to_string(),
        exec_args: ExecArgs::new(),
        stores: vec![StoreConfig::local("local", dir.path())],
        resources: vec![DataResource::new("orders", "orders.csv", "local")],
        constraints: Some(vec![constraint]),
        error_report: Some(ErrorReport::Full),
    };

    let output = run_worker(&serde_json::to_vec(&task).unwrap());
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let bundle: Bundle = serde_json::from_slice(&output.stdout).unwrap();
    let report = bundle.report.artifact.unwrap();
    assert_eq!(report.as_validation().unwrap().valid, Some(true));
}

#[test]
fn test_worker_rejects_malformed_task() {
    let output = run_worker(b"{\"operation\": \"inference\"");

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(!output.stderr.is_empty());
}

#[test]
fn test_worker_reports_unknown_backend() {
    let mut task = dummy_task(Operation::Inference);
    task.library = "pandas_profiling".to_string();
    let output = run_worker(&serde_json::to_vec(&task).unwrap());

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("pandas_profiling"), "{stderr}");
}
