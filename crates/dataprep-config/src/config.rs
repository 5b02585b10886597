// crates/dataprep-config/src/config.rs
// ============================================================================
// Module: Dataprep Configuration
// Description: Configuration loading and validation for the analysis workers.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: dataprep-core, dataprep-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section is optional and falls back to defaults that validate on
//! their own; unknown keys and out-of-range values are rejected rather than
//! ignored. Validated sections convert into the runtime option types used by
//! the workers ([`WorkerConfig`], [`PoolOptions`], [`EngineParameters`]) and
//! the `SQLite` backends ([`SqliteStoreConfig`]).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use dataprep_core::EngineParameters;
use dataprep_core::EnrichmentPolicy;
use dataprep_core::OutputFormat;
use dataprep_core::PoolOptions;
use dataprep_core::WorkerConfig;
use dataprep_core::runtime::EventLevel;
use dataprep_core::runtime::MaterializeOptions;
use dataprep_core::runtime::ScorerKind;
use dataprep_core::runtime::content::DEFAULT_MAX_MATERIALIZE_BYTES;
use dataprep_store_sqlite::SqliteStoreConfig;
use dataprep_store_sqlite::SqliteStoreMode;
use dataprep_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "dataprep-analysis.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "DATAPREP_ANALYSIS_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of consumer threads per destination.
pub(crate) const MAX_WORKER_THREADS: usize = 64;
/// Minimum idle poll interval in milliseconds.
pub(crate) const MIN_POLL_INTERVAL_MS: u64 = 10;
/// Maximum idle poll interval in milliseconds.
pub(crate) const MAX_POLL_INTERVAL_MS: u64 = 60_000;
/// Minimum lock lease in milliseconds.
pub(crate) const MIN_LOCK_LEASE_MS: u64 = 1_000;
/// Upper bound for lease, timeout, and redelivery durations in milliseconds.
pub(crate) const MAX_DURATION_MS: u64 = 3_600_000;
/// Upper bound for the per-request delivery limit.
pub(crate) const MAX_DELIVERIES: u64 = 10_000;
/// Maximum lock poll interval in milliseconds.
pub(crate) const MAX_LOCK_POLL_INTERVAL_MS: u64 = 10_000;
/// Minimum channel visibility timeout in milliseconds.
pub(crate) const MIN_VISIBILITY_TIMEOUT_MS: u64 = 1_000;
/// Maximum channel visibility timeout in milliseconds.
pub(crate) const MAX_VISIBILITY_TIMEOUT_MS: u64 = 86_400_000;
/// Minimum client timeout in milliseconds.
pub(crate) const MIN_CLIENT_TIMEOUT_MS: u64 = 100;
/// Maximum client timeout in milliseconds.
pub(crate) const MAX_CLIENT_TIMEOUT_MS: u64 = 600_000;
/// Maximum `SQLite` busy timeout in milliseconds.
pub(crate) const MAX_BUSY_TIMEOUT_MS: u64 = 60_000;
/// Maximum length of the engine concurrency hint.
pub(crate) const MAX_CONCURRENCY_HINT_LENGTH: usize = 64;
/// Maximum number of leading engine command arguments.
pub(crate) const MAX_ENGINE_ARGS: usize = 64;
/// Maximum length of a URL setting.
pub(crate) const MAX_URL_LENGTH: usize = 2048;
/// Default content root for the file-backed content store.
pub(crate) const DEFAULT_CONTENT_ROOT: &str = "datasets";
/// Default `SQLite` database path.
pub(crate) const DEFAULT_STORE_PATH: &str = "dataprep-analysis.sqlite";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Analysis worker configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataprepConfig {
    /// Worker timing and stage behavior.
    #[serde(default)]
    pub worker: WorkerRuntimeConfig,
    /// Statistics engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Metadata store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Message channel configuration.
    #[serde(default)]
    pub channel: ChannelConfig,
    /// Dataset content configuration.
    #[serde(default)]
    pub content: ContentConfig,
    /// Event sink configuration.
    #[serde(default)]
    pub events: EventsConfig,
    /// Path the configuration was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl DataprepConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The explicit path wins, then [`CONFIG_ENV_VAR`], then
    /// `dataprep-analysis.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(format!("{}: {err}", resolved.display())))?;
        let mut config = Self::from_bytes(&bytes)?;
        config.source_path = Some(resolved);
        Ok(config)
    }

    /// Parses and validates configuration from raw file bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the bytes are oversized, not UTF-8, not
    /// valid TOML, or fail validation.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content =
            std::str::from_utf8(bytes).map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.worker.validate()?;
        self.engine.validate()?;
        self.store.validate()?;
        self.channel.validate()?;
        self.content.validate()?;
        self.events.validate()?;
        if self.worker.scorer == ScorerKind::Engine && self.engine.engine_type == EngineType::None {
            return Err(ConfigError::Invalid("worker.scorer = engine requires an engine type".to_string()));
        }
        if self.channel.visibility_timeout_ms < self.worker.lock_lease_ms {
            return Err(ConfigError::Invalid(
                "channel.visibility_timeout_ms must be at least worker.lock_lease_ms".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Worker
// ============================================================================

/// Worker runtime configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerRuntimeConfig {
    /// Consumer threads per destination.
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Idle wait after a poll round that acknowledged nothing.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Maximum wait for a dataset lock; unbounded when unset.
    #[serde(default)]
    pub lock_timeout_ms: Option<u64>,
    /// Lease granted to a lock holder before it must renew.
    #[serde(default = "default_lock_lease_ms")]
    pub lock_lease_ms: u64,
    /// Interval between lock acquisition attempts.
    #[serde(default = "default_lock_poll_interval_ms")]
    pub lock_poll_interval_ms: u64,
    /// Redelivery delay when a stage precondition is not yet met.
    #[serde(default)]
    pub precondition_retry_delay_ms: u64,
    /// Redelivery delay after transient failures.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Deliveries after which a request is dropped; unbounded when unset.
    #[serde(default)]
    pub max_deliveries: Option<u32>,
    /// How engine failures affect the quality stage.
    #[serde(default)]
    pub enrichment_policy: EnrichmentPolicy,
    /// Column quality scorer.
    #[serde(default)]
    pub scorer: ScorerKind,
    /// Maximum bytes copied into a content snapshot.
    #[serde(default = "default_snapshot_max_bytes")]
    pub snapshot_max_bytes: u64,
    /// Directory for content snapshots; the system temp directory when unset.
    #[serde(default)]
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for WorkerRuntimeConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            poll_interval_ms: default_poll_interval_ms(),
            lock_timeout_ms: None,
            lock_lease_ms: default_lock_lease_ms(),
            lock_poll_interval_ms: default_lock_poll_interval_ms(),
            precondition_retry_delay_ms: 0,
            retry_delay_ms: default_retry_delay_ms(),
            max_deliveries: None,
            enrichment_policy: EnrichmentPolicy::default(),
            scorer: ScorerKind::default(),
            snapshot_max_bytes: default_snapshot_max_bytes(),
            snapshot_dir: None,
        }
    }
}

impl WorkerRuntimeConfig {
    /// Validates worker configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 || self.threads > MAX_WORKER_THREADS {
            return Err(ConfigError::Invalid(format!("worker.threads must be between 1 and {MAX_WORKER_THREADS}")));
        }
        validate_range("worker.poll_interval_ms", self.poll_interval_ms, MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS)?;
        if let Some(timeout) = self.lock_timeout_ms {
            validate_range("worker.lock_timeout_ms", timeout, 1, MAX_DURATION_MS)?;
        }
        validate_range("worker.lock_lease_ms", self.lock_lease_ms, MIN_LOCK_LEASE_MS, MAX_DURATION_MS)?;
        validate_range("worker.lock_poll_interval_ms", self.lock_poll_interval_ms, 1, MAX_LOCK_POLL_INTERVAL_MS)?;
        validate_range("worker.precondition_retry_delay_ms", self.precondition_retry_delay_ms, 0, MAX_DURATION_MS)?;
        validate_range("worker.retry_delay_ms", self.retry_delay_ms, 0, MAX_DURATION_MS)?;
        if let Some(limit) = self.max_deliveries {
            validate_range("worker.max_deliveries", u64::from(limit), 1, MAX_DELIVERIES)?;
        }
        if self.snapshot_max_bytes == 0 {
            return Err(ConfigError::Invalid("worker.snapshot_max_bytes must be greater than zero".to_string()));
        }
        if let Some(dir) = &self.snapshot_dir {
            validate_path_string("worker.snapshot_dir", &dir.to_string_lossy())?;
        }
        Ok(())
    }

    /// Returns the per-message worker timing.
    #[must_use]
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            lock_timeout: self.lock_timeout_ms.map(Duration::from_millis),
            precondition_retry_delay: Duration::from_millis(self.precondition_retry_delay_ms),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            max_deliveries: self.max_deliveries,
        }
    }

    /// Returns the consumer pool options.
    #[must_use]
    pub const fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            threads: self.threads,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    /// Returns the lock lease duration.
    #[must_use]
    pub const fn lock_lease(&self) -> Duration {
        Duration::from_millis(self.lock_lease_ms)
    }

    /// Returns the lock acquisition poll interval.
    #[must_use]
    pub const fn lock_poll_interval(&self) -> Duration {
        Duration::from_millis(self.lock_poll_interval_ms)
    }

    /// Returns the content snapshot limits.
    #[must_use]
    pub fn materialize_options(&self) -> MaterializeOptions {
        MaterializeOptions {
            max_bytes: self.snapshot_max_bytes,
            directory: self.snapshot_dir.clone(),
        }
    }
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Statistics engine backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EngineType {
    /// No engine; the quality stage skips enrichment.
    #[default]
    None,
    /// Engine reached over HTTP.
    Http,
    /// Engine spawned as a local executable.
    Command,
}

/// Statistics engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Engine backend type.
    #[serde(rename = "type", default)]
    pub engine_type: EngineType,
    /// Analysis endpoint for the http engine.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Executable for the command engine.
    #[serde(default)]
    pub program: Option<PathBuf>,
    /// Leading arguments for the command engine.
    #[serde(default)]
    pub args: Vec<String>,
    /// Per-analysis time limit.
    #[serde(default = "default_client_timeout_ms")]
    pub timeout_ms: u64,
    /// Parallelism hint passed to the engine.
    #[serde(default = "default_concurrency_hint")]
    pub concurrency_hint: String,
    /// Row offset where sampling starts.
    #[serde(default)]
    pub start_offset: u64,
    /// Sampling threshold.
    #[serde(default = "default_sample_limit")]
    pub sample_limit: u64,
    /// Requested output format.
    #[serde(default)]
    pub output_format: OutputFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine_type: EngineType::default(),
            endpoint: None,
            program: None,
            args: Vec::new(),
            timeout_ms: default_client_timeout_ms(),
            concurrency_hint: default_concurrency_hint(),
            start_offset: 0,
            sample_limit: default_sample_limit(),
            output_format: OutputFormat::default(),
        }
    }
}

impl EngineConfig {
    /// Validates engine configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.engine_type {
            EngineType::None => {
                if self.endpoint.is_some() || self.program.is_some() {
                    return Err(ConfigError::Invalid(
                        "engine type none must not set endpoint or program".to_string(),
                    ));
                }
            }
            EngineType::Http => {
                if self.program.is_some() || !self.args.is_empty() {
                    return Err(ConfigError::Invalid("http engine must not set program or args".to_string()));
                }
                let endpoint = self
                    .endpoint
                    .as_deref()
                    .ok_or_else(|| ConfigError::Invalid("http engine requires endpoint".to_string()))?;
                validate_http_url("engine.endpoint", endpoint)?;
            }
            EngineType::Command => {
                if self.endpoint.is_some() {
                    return Err(ConfigError::Invalid("command engine must not set endpoint".to_string()));
                }
                let program = self
                    .program
                    .as_ref()
                    .ok_or_else(|| ConfigError::Invalid("command engine requires program".to_string()))?;
                validate_path_string("engine.program", &program.to_string_lossy())?;
                if self.args.len() > MAX_ENGINE_ARGS {
                    return Err(ConfigError::Invalid(format!("engine.args exceeds {MAX_ENGINE_ARGS} entries")));
                }
            }
        }
        validate_range("engine.timeout_ms", self.timeout_ms, MIN_CLIENT_TIMEOUT_MS, MAX_CLIENT_TIMEOUT_MS)?;
        let hint = self.concurrency_hint.trim();
        if hint.is_empty() || hint != self.concurrency_hint {
            return Err(ConfigError::Invalid("engine.concurrency_hint must be non-empty and trimmed".to_string()));
        }
        if hint.len() > MAX_CONCURRENCY_HINT_LENGTH {
            return Err(ConfigError::Invalid("engine.concurrency_hint is too long".to_string()));
        }
        if self.sample_limit == 0 {
            return Err(ConfigError::Invalid("engine.sample_limit must be greater than zero".to_string()));
        }
        Ok(())
    }

    /// Returns the fixed parameters passed on every engine call.
    #[must_use]
    pub fn parameters(&self) -> EngineParameters {
        EngineParameters {
            concurrency_hint: self.concurrency_hint.clone(),
            start_offset: self.start_offset,
            sample_limit: self.sample_limit,
            output_format: self.output_format,
        }
    }

    /// Returns the per-analysis time limit.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Metadata store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// `SQLite` database path shared by the store, locks, and channel.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Optional max snapshot versions to retain per dataset.
    #[serde(default)]
    pub max_versions: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            max_versions: None,
        }
    }
}

impl StoreConfig {
    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("store.path", &self.path.to_string_lossy())?;
        validate_range("store.busy_timeout_ms", self.busy_timeout_ms, 0, MAX_BUSY_TIMEOUT_MS)?;
        if self.max_versions == Some(0) {
            return Err(ConfigError::Invalid("store.max_versions must be greater than zero".to_string()));
        }
        Ok(())
    }

    /// Returns the `SQLite` backend configuration.
    #[must_use]
    pub fn sqlite_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: self.path.clone(),
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
            max_versions: self.max_versions,
        }
    }
}

// ============================================================================
// SECTION: Channel
// ============================================================================

/// Message channel configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    /// How long a received message stays hidden before redelivery.
    #[serde(default = "default_visibility_timeout_ms")]
    pub visibility_timeout_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            visibility_timeout_ms: default_visibility_timeout_ms(),
        }
    }
}

impl ChannelConfig {
    /// Validates channel configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_range(
            "channel.visibility_timeout_ms",
            self.visibility_timeout_ms,
            MIN_VISIBILITY_TIMEOUT_MS,
            MAX_VISIBILITY_TIMEOUT_MS,
        )
    }

    /// Returns the visibility timeout.
    #[must_use]
    pub const fn visibility_timeout(&self) -> Duration {
        Duration::from_millis(self.visibility_timeout_ms)
    }
}

// ============================================================================
// SECTION: Content
// ============================================================================

/// Dataset content backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Files named by dataset id under a root directory.
    #[default]
    File,
    /// Objects fetched from a base URL plus the dataset id.
    Http,
}

/// Dataset content configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentConfig {
    /// Content backend type.
    #[serde(rename = "type", default)]
    pub content_type: ContentType,
    /// Root directory for the file backend; `datasets` when unset.
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Base URL for the http backend.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Request timeout for the http backend.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Response size cap for the http backend.
    #[serde(default)]
    pub max_bytes: Option<u64>,
}

impl ContentConfig {
    /// Validates content configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.content_type {
            ContentType::File => {
                if self.base_url.is_some() || self.timeout_ms.is_some() || self.max_bytes.is_some() {
                    return Err(ConfigError::Invalid(
                        "file content must not set base_url, timeout_ms, or max_bytes".to_string(),
                    ));
                }
                validate_path_string("content.root", &self.root_path().to_string_lossy())
            }
            ContentType::Http => {
                if self.root.is_some() {
                    return Err(ConfigError::Invalid("http content must not set root".to_string()));
                }
                let base = self
                    .base_url
                    .as_deref()
                    .ok_or_else(|| ConfigError::Invalid("http content requires base_url".to_string()))?;
                validate_http_url("content.base_url", base)?;
                if let Some(timeout) = self.timeout_ms {
                    validate_range("content.timeout_ms", timeout, MIN_CLIENT_TIMEOUT_MS, MAX_CLIENT_TIMEOUT_MS)?;
                }
                if self.max_bytes == Some(0) {
                    return Err(ConfigError::Invalid("content.max_bytes must be greater than zero".to_string()));
                }
                Ok(())
            }
        }
    }

    /// Returns the file backend root directory.
    #[must_use]
    pub fn root_path(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONTENT_ROOT))
    }

    /// Returns the http backend timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or_else(default_client_timeout_ms))
    }
}

// ============================================================================
// SECTION: Events
// ============================================================================

/// Event sink type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventSinkType {
    /// JSON lines on standard error.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Events discarded.
    None,
}

/// Event sink configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventsConfig {
    /// Sink type.
    #[serde(rename = "type", default)]
    pub sink_type: EventSinkType,
    /// Output path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Lowest level written.
    #[serde(default = "default_min_level")]
    pub min_level: EventLevel,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            sink_type: EventSinkType::default(),
            path: None,
            min_level: default_min_level(),
        }
    }
}

impl EventsConfig {
    /// Validates event sink configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink_type, &self.path) {
            (EventSinkType::File, Some(path)) => validate_path_string("events.path", &path.to_string_lossy()),
            (EventSinkType::File, None) => Err(ConfigError::Invalid("file events require path".to_string())),
            (_, Some(_)) => Err(ConfigError::Invalid("events.path is only valid for file events".to_string())),
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path setting against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if value.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(value).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} component too long")));
        }
    }
    Ok(())
}

/// Validates that a URL setting names an http(s) endpoint.
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.len() > MAX_URL_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
        .ok_or_else(|| ConfigError::Invalid(format!("{field} must use http or https")))?;
    if rest.is_empty() || rest.starts_with('/') {
        return Err(ConfigError::Invalid(format!("{field} must include a host")));
    }
    Ok(())
}

/// Validates an inclusive numeric range.
fn validate_range(field: &str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Invalid(format!("{field} must be between {min} and {max}")));
    }
    Ok(())
}

/// Default consumer threads.
const fn default_threads() -> usize {
    1
}

/// Default idle poll interval.
const fn default_poll_interval_ms() -> u64 {
    500
}

/// Default lock lease.
const fn default_lock_lease_ms() -> u64 {
    60_000
}

/// Default lock acquisition poll interval.
const fn default_lock_poll_interval_ms() -> u64 {
    100
}

/// Default transient-failure redelivery delay.
const fn default_retry_delay_ms() -> u64 {
    5_000
}

/// Default snapshot size cap.
const fn default_snapshot_max_bytes() -> u64 {
    DEFAULT_MAX_MATERIALIZE_BYTES
}

/// Default client timeout.
const fn default_client_timeout_ms() -> u64 {
    60_000
}

/// Default engine concurrency hint.
fn default_concurrency_hint() -> String {
    EngineParameters::default().concurrency_hint
}

/// Default engine sampling threshold.
const fn default_sample_limit() -> u64 {
    2
}

/// Default `SQLite` database path.
fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}

/// Default `SQLite` busy timeout.
const fn default_store_busy_timeout_ms() -> u64 {
    5_000
}

/// Default channel visibility timeout.
const fn default_visibility_timeout_ms() -> u64 {
    300_000
}

/// Default minimum event level.
const fn default_min_level() -> EventLevel {
    EventLevel::Info
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn http_url_requires_scheme_and_host() {
        assert!(validate_http_url("f", "https://engine.local/analyze").is_ok());
        assert!(validate_http_url("f", "http://10.0.0.1:8080").is_ok());
        assert!(validate_http_url("f", "ftp://engine.local").is_err());
        assert!(validate_http_url("f", "https://").is_err());
        assert!(validate_http_url("f", "http:///path").is_err());
    }

    #[test]
    fn range_bounds_are_inclusive() {
        assert!(validate_range("f", 10, 10, 20).is_ok());
        assert!(validate_range("f", 20, 10, 20).is_ok());
        assert!(validate_range("f", 21, 10, 20).is_err());
        assert!(validate_range("f", 9, 10, 20).is_err());
    }

    #[test]
    fn path_string_rejects_blank_and_long_components() {
        assert!(validate_path_string("f", "  ").is_err());
        assert!(validate_path_string("f", &"a".repeat(MAX_PATH_COMPONENT_LENGTH + 1)).is_err());
        assert!(validate_path_string("f", "data/store.sqlite").is_ok());
    }

    #[test]
    fn explicit_path_wins_resolution() {
        let resolved = resolve_path(Some(Path::new("custom.toml"))).unwrap();
        assert_eq!(resolved, PathBuf::from("custom.toml"));
    }
}
