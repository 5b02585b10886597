// crates/dataprep-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic starting point for operators and tooling.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for `dataprep-analysis.toml`. The output is static and
//! validates as-is; optional keys are shown commented out.

/// Returns a canonical example `dataprep-analysis.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[worker]
threads = 4
poll_interval_ms = 500
# lock_timeout_ms = 30000
lock_lease_ms = 60000
lock_poll_interval_ms = 100
precondition_retry_delay_ms = 0
retry_delay_ms = 5000
max_deliveries = 50
enrichment_policy = "best_effort"
scorer = "random"
snapshot_max_bytes = 268435456
# snapshot_dir = "/var/tmp/dataprep"

[engine]
type = "http"
endpoint = "http://127.0.0.1:8090/analyze"
timeout_ms = 60000
concurrency_hint = "local[4]"
start_offset = 0
sample_limit = 2
output_format = "json"

[store]
path = "dataprep-analysis.sqlite"
journal_mode = "wal"
sync_mode = "full"
busy_timeout_ms = 5000
max_versions = 16

[channel]
visibility_timeout_ms = 300000

[content]
type = "file"
root = "datasets"

[events]
type = "stderr"
min_level = "info"
"#,
    )
}
