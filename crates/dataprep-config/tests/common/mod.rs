// crates/dataprep-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for dataprep-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use dataprep_config::ConfigError;
use dataprep_config::DataprepConfig;

/// Result type used by config tests.
pub type TestResult = Result<(), String>;

/// Parses a TOML string into a `DataprepConfig` without validating it.
pub fn config_from_toml(toml_str: &str) -> Result<DataprepConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<DataprepConfig, String> {
    config_from_toml("").map_err(|err| err.to_string())
}

/// Checks that validation failed with a message containing `needle`.
pub fn assert_invalid(result: Result<(), ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(()) => Err("expected invalid config".to_string()),
    }
}
