// crates/dataprep-config/tests/section_validation.rs
// =============================================================================
// Module: Section Validation Tests
// Description: Validate per-section and cross-section constraints.
// Purpose: Ensure inconsistent backend settings are rejected before startup.
// =============================================================================
//! ## Overview
//! Each test starts from the default config, breaks one rule, and checks the
//! validation message names the offending key.

use std::path::PathBuf;

use dataprep_config::ContentType;
use dataprep_config::EngineType;
use dataprep_config::EventSinkType;
use dataprep_core::runtime::ScorerKind;

mod common;
use common::TestResult;
use common::assert_invalid;

#[test]
fn worker_threads_are_bounded() -> TestResult {
    let mut config = common::minimal_config()?;
    config.worker.threads = 65;
    assert_invalid(config.validate(), "worker.threads must be between 1 and 64")
}

#[test]
fn worker_lock_timeout_must_be_positive() -> TestResult {
    let mut config = common::minimal_config()?;
    config.worker.lock_timeout_ms = Some(0);
    assert_invalid(config.validate(), "worker.lock_timeout_ms")
}

#[test]
fn worker_lease_has_floor() -> TestResult {
    let mut config = common::minimal_config()?;
    config.worker.lock_lease_ms = 10;
    assert_invalid(config.validate(), "worker.lock_lease_ms")
}

#[test]
fn worker_snapshot_cap_must_be_positive() -> TestResult {
    let mut config = common::minimal_config()?;
    config.worker.snapshot_max_bytes = 0;
    assert_invalid(config.validate(), "worker.snapshot_max_bytes")
}

#[test]
fn worker_delivery_limit_must_be_positive() -> TestResult {
    let mut config = common::minimal_config()?;
    config.worker.max_deliveries = Some(0);
    assert_invalid(config.validate(), "worker.max_deliveries must be between 1 and 10000")
}

#[test]
fn worker_delivery_limit_reaches_worker_config() -> TestResult {
    let mut config = common::minimal_config()?;
    config.worker.max_deliveries = Some(5);
    config.validate().map_err(|err| err.to_string())?;
    if config.worker.worker_config().max_deliveries != Some(5) {
        return Err("max_deliveries not carried into worker config".to_string());
    }
    Ok(())
}

#[test]
fn visibility_timeout_covers_lock_lease() -> TestResult {
    let mut config = common::minimal_config()?;
    config.worker.lock_lease_ms = 120_000;
    config.channel.visibility_timeout_ms = 60_000;
    assert_invalid(config.validate(), "channel.visibility_timeout_ms must be at least worker.lock_lease_ms")
}

#[test]
fn http_engine_requires_endpoint() -> TestResult {
    let mut config = common::minimal_config()?;
    config.engine.engine_type = EngineType::Http;
    assert_invalid(config.validate(), "http engine requires endpoint")?;
    config.engine.endpoint = Some("file:///tmp/engine".to_string());
    assert_invalid(config.validate(), "engine.endpoint must use http or https")?;
    config.engine.endpoint = Some("http://127.0.0.1:8090/analyze".to_string());
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn command_engine_requires_program() -> TestResult {
    let mut config = common::minimal_config()?;
    config.engine.engine_type = EngineType::Command;
    assert_invalid(config.validate(), "command engine requires program")?;
    config.engine.program = Some(PathBuf::from("/usr/local/bin/profile-engine"));
    config.engine.args = vec!["--quiet".to_string()];
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn disabled_engine_rejects_targets() -> TestResult {
    let mut config = common::minimal_config()?;
    config.engine.endpoint = Some("http://127.0.0.1:8090".to_string());
    assert_invalid(config.validate(), "engine type none must not set endpoint or program")
}

#[test]
fn engine_concurrency_hint_must_be_trimmed() -> TestResult {
    let mut config = common::minimal_config()?;
    config.engine.concurrency_hint = " local[2]".to_string();
    assert_invalid(config.validate(), "engine.concurrency_hint")
}

#[test]
fn engine_sample_limit_must_be_positive() -> TestResult {
    let mut config = common::minimal_config()?;
    config.engine.sample_limit = 0;
    assert_invalid(config.validate(), "engine.sample_limit")
}

#[test]
fn engine_scorer_requires_engine() -> TestResult {
    let mut config = common::minimal_config()?;
    config.worker.scorer = ScorerKind::Engine;
    assert_invalid(config.validate(), "worker.scorer = engine requires an engine type")?;
    config.engine.engine_type = EngineType::Command;
    config.engine.program = Some(PathBuf::from("profile-engine"));
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn store_max_versions_must_be_positive() -> TestResult {
    let mut config = common::minimal_config()?;
    config.store.max_versions = Some(0);
    assert_invalid(config.validate(), "store.max_versions must be greater than zero")
}

#[test]
fn store_path_must_be_non_empty() -> TestResult {
    let mut config = common::minimal_config()?;
    config.store.path = PathBuf::new();
    assert_invalid(config.validate(), "store.path must be non-empty")
}

#[test]
fn http_content_requires_base_url_and_no_root() -> TestResult {
    let mut config = common::minimal_config()?;
    config.content.content_type = ContentType::Http;
    assert_invalid(config.validate(), "http content requires base_url")?;
    config.content.base_url = Some("https://objects.internal/datasets/".to_string());
    config.content.root = Some(PathBuf::from("datasets"));
    assert_invalid(config.validate(), "http content must not set root")?;
    config.content.root = None;
    config.content.max_bytes = Some(1024);
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn file_content_rejects_http_settings() -> TestResult {
    let mut config = common::minimal_config()?;
    config.content.max_bytes = Some(1024);
    assert_invalid(config.validate(), "file content must not set")
}

#[test]
fn file_events_require_path() -> TestResult {
    let mut config = common::minimal_config()?;
    config.events.sink_type = EventSinkType::File;
    assert_invalid(config.validate(), "file events require path")?;
    config.events.path = Some(PathBuf::from("events.jsonl"));
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn non_file_events_reject_path() -> TestResult {
    let mut config = common::minimal_config()?;
    config.events.path = Some(PathBuf::from("events.jsonl"));
    assert_invalid(config.validate(), "events.path is only valid for file events")
}
