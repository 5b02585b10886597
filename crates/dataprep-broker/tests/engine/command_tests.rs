// crates/dataprep-broker/tests/engine/command_tests.rs
// ============================================================================
// Module: CommandAnalysisEngine Tests
// Description: Engine runs through `sh` scripts standing in for the engine.
// ============================================================================

use std::time::Duration;

use dataprep_broker::CommandAnalysisEngine;
use dataprep_core::AnalysisEngine;
use dataprep_core::EngineError;
use dataprep_core::EngineParameters;
use dataprep_core::EngineRequest;

use crate::common::SAMPLE_CSV;
use crate::common::snapshot;

/// Runs `script` under `sh -c` against a fresh snapshot of the sample content.
fn run(script: &str, timeout: Option<Duration>) -> Result<String, EngineError> {
    let file = snapshot(SAMPLE_CSV);
    let parameters = EngineParameters::default();
    let mut engine = CommandAnalysisEngine::new("sh").with_args(["-c", script, "engine"]);
    if let Some(timeout) = timeout {
        engine = engine.with_timeout(timeout);
    }
    engine.analyze(&EngineRequest {
        parameters: &parameters,
        delimiter: ',',
        content_path: file.path(),
    })
}

#[test]
fn command_engine_passes_parameters_and_snapshot_path() {
    let output = run(r#"printf '%s ' "$@"; cat "${11}""#, None).unwrap();
    let (arguments, content) = output.split_at(output.find("id;").unwrap());
    let arguments: Vec<&str> = arguments.split_whitespace().collect();

    assert_eq!(&arguments[.. 10], [
        "--concurrency",
        "local[4]",
        "--start-offset",
        "0",
        "--sample-limit",
        "2",
        "--delimiter",
        ",",
        "--format",
        "json"
    ]);
    assert_eq!(content, SAMPLE_CSV);
}

#[test]
fn command_engine_returns_stdout_verbatim() {
    let output = run(r#"printf '{"columns":[]}'"#, None).unwrap();
    assert_eq!(output, r#"{"columns":[]}"#);
}

#[test]
fn command_engine_reports_exit_status_and_stderr() {
    let result = run("echo 'engine exploded' >&2; exit 3", None);
    match result {
        Err(EngineError::Failed(message)) => assert!(message.contains("engine exploded"), "{message}"),
        other => panic!("unexpected result: {}", other.is_ok()),
    }
}

#[test]
fn command_engine_missing_program_is_unavailable() {
    let file = snapshot(SAMPLE_CSV);
    let parameters = EngineParameters::default();
    let engine = CommandAnalysisEngine::new("/nonexistent/dataprep-engine");
    let result = engine.analyze(&EngineRequest {
        parameters: &parameters,
        delimiter: ';',
        content_path: file.path(),
    });
    assert!(matches!(result, Err(EngineError::Unavailable(_))));
}

#[test]
fn command_engine_kills_process_after_timeout() {
    let started = std::time::Instant::now();
    let result = run("exec sleep 5", Some(Duration::from_millis(100)));
    match result {
        Err(EngineError::Failed(message)) => assert!(message.contains("timed out"), "{message}"),
        other => panic!("unexpected result: {}", other.is_ok()),
    }
    assert!(started.elapsed() < Duration::from_secs(4));
}
