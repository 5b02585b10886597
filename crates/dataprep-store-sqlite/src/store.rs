// crates/dataprep-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Metadata Store
// Description: Durable MetadataStore backed by SQLite WAL.
// Purpose: Persist dataset metadata snapshots with deterministic serialization.
// Dependencies: dataprep-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`MetadataStore`] using `SQLite`. Each
//! write produces a canonical JSON snapshot stored in an append-only version
//! table. Loads verify integrity via stored hashes and fail closed on
//! corruption. The same connection backs the lease lock manager and the
//! message channel, see [`SqliteMetadataStore::lock_manager`] and
//! [`SqliteMetadataStore::message_channel`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use dataprep_core::DatasetId;
use dataprep_core::DatasetMetadata;
use dataprep_core::LockError;
use dataprep_core::MetadataStore;
use dataprep_core::StoreError;
use dataprep_core::Timestamp;
use dataprep_core::hashing::DEFAULT_HASH_ALGORITHM;
use dataprep_core::hashing::HashAlgorithm;
use dataprep_core::hashing::canonical_json_bytes;
use dataprep_core::hashing::hash_bytes;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

use crate::channel::SqliteMessageChannel;
use crate::lock::SqliteLockManager;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum metadata snapshot size accepted by the store.
pub const MAX_METADATA_BYTES: usize = 8 * 1024 * 1024;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` backends.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Optional maximum snapshot versions per dataset (older versions pruned).
    #[serde(default)]
    pub max_versions: Option<u64>,
}

impl SqliteStoreConfig {
    /// Creates a configuration with default pragmas for the given file.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            max_versions: None,
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store corruption or hash mismatch.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Conditional update found no record.
    #[error("sqlite store record not found: {0}")]
    NotFound(String),
    /// Store payload exceeded configured size limits.
    #[error("sqlite store payload too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
}

impl From<rusqlite::Error> for SqliteStoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Db(error.to_string())
    }
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::NotFound(message) => Self::NotFound(message),
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Invalid(format!(
                "metadata_json exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
        }
    }
}

impl From<SqliteStoreError> for LockError {
    fn from(error: SqliteStoreError) -> Self {
        Self::Backend(error.to_string())
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed metadata store with WAL support.
#[derive(Clone)]
pub struct SqliteMetadataStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteMetadataStore {
    /// Opens an `SQLite`-backed metadata store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        if config.max_versions == Some(0) {
            return Err(SqliteStoreError::Invalid(
                "max_versions must be greater than zero".to_string(),
            ));
        }
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns a lease lock manager sharing this store's database.
    #[must_use]
    pub fn lock_manager(&self, lease: Duration, poll_interval: Duration) -> SqliteLockManager {
        SqliteLockManager::new(Arc::clone(&self.connection), lease, poll_interval)
    }

    /// Returns a durable message channel sharing this store's database.
    #[must_use]
    pub fn message_channel(&self, visibility_timeout: Duration) -> SqliteMessageChannel {
        SqliteMessageChannel::new(Arc::clone(&self.connection), visibility_timeout)
    }

    /// Returns the number of retained snapshot versions for a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn versions(&self, id: &DatasetId) -> Result<u64, SqliteStoreError> {
        let guard = lock_connection(&self.connection)?;
        let count: i64 = guard.query_row(
            "SELECT COUNT(*) FROM dataset_versions WHERE dataset_id = ?1",
            params![id.as_str()],
            |row| row.get(0),
        )?;
        drop(guard);
        u64::try_from(count)
            .map_err(|_| SqliteStoreError::Corrupt("negative version count".to_string()))
    }
}

impl MetadataStore for SqliteMetadataStore {
    fn get(&self, id: &DatasetId) -> Result<Option<DatasetMetadata>, StoreError> {
        self.load_metadata(id).map_err(StoreError::from)
    }

    fn add(&self, metadata: &DatasetMetadata) -> Result<(), StoreError> {
        self.save_metadata(metadata, false).map_err(StoreError::from)
    }

    fn update(&self, metadata: &DatasetMetadata) -> Result<(), StoreError> {
        self.save_metadata(metadata, true).map_err(StoreError::from)
    }

    fn remove(&self, id: &DatasetId) -> Result<bool, StoreError> {
        self.remove_metadata(id).map_err(StoreError::from)
    }

    fn list(&self) -> Result<Vec<DatasetId>, StoreError> {
        self.list_ids().map_err(StoreError::from)
    }
}

impl SqliteMetadataStore {
    /// Loads metadata for the provided dataset identifier.
    fn load_metadata(&self, id: &DatasetId) -> Result<Option<DatasetMetadata>, SqliteStoreError> {
        let row = {
            let mut guard = lock_connection(&self.connection)?;
            let tx = guard.transaction()?;
            let row = match latest_version(&tx, id)? {
                Some(version) => Some(read_version(&tx, id, version)?),
                None => None,
            };
            tx.commit()?;
            drop(guard);
            row
        };
        let Some((bytes, hash_value, hash_algorithm)) = row else {
            return Ok(None);
        };
        let algorithm = parse_hash_algorithm(&hash_algorithm)?;
        let expected = hash_bytes(algorithm, &bytes);
        if expected.value != hash_value {
            return Err(SqliteStoreError::Corrupt(format!(
                "hash mismatch for dataset {}",
                id.as_str()
            )));
        }
        let metadata: DatasetMetadata = serde_json::from_slice(&bytes)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        if metadata.id() != id {
            return Err(SqliteStoreError::Invalid(
                "dataset_id mismatch between key and payload".to_string(),
            ));
        }
        Ok(Some(metadata))
    }

    /// Appends a metadata snapshot, optionally requiring an existing record.
    fn save_metadata(
        &self,
        metadata: &DatasetMetadata,
        require_existing: bool,
    ) -> Result<(), SqliteStoreError> {
        let canonical_json = canonical_json_bytes(metadata)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        if canonical_json.len() > MAX_METADATA_BYTES {
            return Err(SqliteStoreError::TooLarge {
                max_bytes: MAX_METADATA_BYTES,
                actual_bytes: canonical_json.len(),
            });
        }
        let digest = hash_bytes(DEFAULT_HASH_ALGORITHM, &canonical_json);
        let saved_at = Timestamp::now().as_unix_millis();
        let id = metadata.id();
        {
            let mut guard = lock_connection(&self.connection)?;
            let tx = guard.transaction()?;
            let next_version = match latest_version(&tx, id)? {
                None if require_existing => {
                    return Err(SqliteStoreError::NotFound(id.as_str().to_string()));
                }
                None => 1,
                Some(value) => value.checked_add(1).ok_or_else(|| {
                    SqliteStoreError::Corrupt(format!(
                        "metadata version overflow for dataset {}",
                        id.as_str()
                    ))
                })?,
            };
            tx.execute(
                "INSERT INTO datasets (dataset_id, latest_version) VALUES (?1, ?2) \
                 ON CONFLICT(dataset_id) DO UPDATE SET latest_version = excluded.latest_version",
                params![id.as_str(), next_version],
            )?;
            tx.execute(
                "INSERT INTO dataset_versions (dataset_id, version, metadata_json, metadata_hash, \
                 hash_algorithm, saved_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id.as_str(),
                    next_version,
                    canonical_json,
                    digest.value,
                    digest.algorithm.label(),
                    saved_at
                ],
            )?;
            enforce_retention(&tx, id.as_str(), next_version, self.config.max_versions)?;
            tx.commit()?;
            drop(guard);
        }
        Ok(())
    }

    /// Deletes a dataset and its snapshot history.
    fn remove_metadata(&self, id: &DatasetId) -> Result<bool, SqliteStoreError> {
        let guard = lock_connection(&self.connection)?;
        let removed =
            guard.execute("DELETE FROM datasets WHERE dataset_id = ?1", params![id.as_str()])?;
        drop(guard);
        Ok(removed > 0)
    }

    /// Lists stored dataset identifiers in ascending order.
    fn list_ids(&self) -> Result<Vec<DatasetId>, SqliteStoreError> {
        let guard = lock_connection(&self.connection)?;
        let mut statement = guard.prepare("SELECT dataset_id FROM datasets ORDER BY dataset_id")?;
        let ids = statement
            .query_map(params![], |row| row.get::<_, String>(0))?
            .map(|row| row.map(DatasetId::new))
            .collect::<Result<Vec<_>, _>>()?;
        drop(statement);
        drop(guard);
        Ok(ids)
    }
}

// ============================================================================
// SECTION: Snapshot Queries
// ============================================================================

/// Returns the latest snapshot version for a dataset, if any.
fn latest_version(tx: &Transaction<'_>, id: &DatasetId) -> Result<Option<i64>, SqliteStoreError> {
    let latest: Option<i64> = tx
        .query_row(
            "SELECT latest_version FROM datasets WHERE dataset_id = ?1",
            params![id.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    match latest {
        Some(value) if value < 1 => Err(SqliteStoreError::Corrupt(format!(
            "invalid latest_version for dataset {}",
            id.as_str()
        ))),
        other => Ok(other),
    }
}

/// Reads a snapshot's bytes, hash, and algorithm label, enforcing the size cap.
fn read_version(
    tx: &Transaction<'_>,
    id: &DatasetId,
    version: i64,
) -> Result<(Vec<u8>, String, String), SqliteStoreError> {
    let header = tx
        .query_row(
            "SELECT length(metadata_json), metadata_hash, hash_algorithm FROM dataset_versions \
             WHERE dataset_id = ?1 AND version = ?2",
            params![id.as_str(), version],
            |row| {
                let length: i64 = row.get(0)?;
                let hash: String = row.get(1)?;
                let algorithm: String = row.get(2)?;
                Ok((length, hash, algorithm))
            },
        )
        .optional()?;
    let Some((length, hash, algorithm)) = header else {
        return Err(SqliteStoreError::Corrupt(format!(
            "missing metadata version {version} for dataset {}",
            id.as_str()
        )));
    };
    let length = usize::try_from(length).map_err(|_| {
        SqliteStoreError::Invalid(format!("negative metadata length for dataset {}", id.as_str()))
    })?;
    if length > MAX_METADATA_BYTES {
        return Err(SqliteStoreError::TooLarge {
            max_bytes: MAX_METADATA_BYTES,
            actual_bytes: length,
        });
    }
    let bytes: Vec<u8> = tx.query_row(
        "SELECT metadata_json FROM dataset_versions WHERE dataset_id = ?1 AND version = ?2",
        params![id.as_str(), version],
        |row| row.get(0),
    )?;
    Ok((bytes, hash, algorithm))
}

/// Enforces version retention if configured.
fn enforce_retention(
    tx: &Transaction<'_>,
    dataset_id: &str,
    latest_version: i64,
    max_versions: Option<u64>,
) -> Result<(), SqliteStoreError> {
    let Some(max_versions) = max_versions else {
        return Ok(());
    };
    let max_versions = i64::try_from(max_versions)
        .map_err(|_| SqliteStoreError::Invalid("max_versions too large".to_string()))?;
    if latest_version > max_versions {
        let min_version = latest_version - max_versions + 1;
        tx.execute(
            "DELETE FROM dataset_versions WHERE dataset_id = ?1 AND version < ?2",
            params![dataset_id, min_version],
        )?;
    }
    Ok(())
}

// ============================================================================
// SECTION: Connection Helpers
// ============================================================================

/// Locks the shared connection.
pub(crate) fn lock_connection(
    connection: &Mutex<Connection>,
) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
    connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
}

/// Converts a duration to whole milliseconds, saturating on overflow.
pub(crate) fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))?;
    connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction()?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS datasets (
                    dataset_id TEXT PRIMARY KEY,
                    latest_version INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS dataset_versions (
                    dataset_id TEXT NOT NULL,
                    version INTEGER NOT NULL,
                    metadata_json BLOB NOT NULL,
                    metadata_hash TEXT NOT NULL,
                    hash_algorithm TEXT NOT NULL,
                    saved_at INTEGER NOT NULL,
                    PRIMARY KEY (dataset_id, version),
                    FOREIGN KEY (dataset_id) REFERENCES datasets(dataset_id) ON DELETE CASCADE
                );
                CREATE TABLE IF NOT EXISTS dataset_locks (
                    lock_key TEXT PRIMARY KEY,
                    token TEXT NOT NULL,
                    expires_at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS channel_messages (
                    message_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    destination TEXT NOT NULL,
                    payload BLOB NOT NULL,
                    visible_at INTEGER NOT NULL,
                    delivery_token TEXT,
                    delivery_count INTEGER NOT NULL DEFAULT 0,
                    published_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_channel_messages_visible
                    ON channel_messages (destination, visible_at);",
            )?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit()?;
    Ok(())
}

/// Parses a hash algorithm label.
fn parse_hash_algorithm(label: &str) -> Result<HashAlgorithm, SqliteStoreError> {
    HashAlgorithm::from_label(label)
        .ok_or_else(|| SqliteStoreError::Invalid(format!("unsupported hash algorithm: {label}")))
}
