// crates/dataprep-store-sqlite/tests/common/mod.rs
// ============================================================================
// Module: SQLite Test Helpers
// Description: Scratch databases and metadata fixtures.
// Purpose: Share setup across the SQLite backend suites.
// ============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]
#![allow(clippy::unwrap_used, reason = "Test helpers unwrap deterministic fixtures.")]

use std::path::Path;

use dataprep_core::AnalysisStage;
use dataprep_core::ColumnId;
use dataprep_core::ColumnMetadata;
use dataprep_core::ColumnType;
use dataprep_core::DatasetId;
use dataprep_core::DatasetMetadata;
use dataprep_core::Lifecycle;
use dataprep_core::Timestamp;
use dataprep_store_sqlite::SqliteMetadataStore;
use dataprep_store_sqlite::SqliteStoreConfig;

/// Opens a store with a short busy timeout.
pub fn store_for(path: &Path) -> SqliteMetadataStore {
    let mut config = SqliteStoreConfig::for_path(path);
    config.busy_timeout_ms = 1_000;
    SqliteMetadataStore::new(config).unwrap()
}

/// Metadata for a three-column dataset with the given stages complete.
pub fn metadata(id: &str, stages: &[AnalysisStage]) -> DatasetMetadata {
    let mut lifecycle = Lifecycle::new();
    for stage in stages {
        lifecycle.mark_complete(*stage).unwrap();
    }
    DatasetMetadata::new(DatasetId::new(id), "customers", Timestamp::from_unix_millis(1_000))
        .with_columns(vec![
            ColumnMetadata::new(ColumnId::from_index(0), "id", ColumnType::Integer),
            ColumnMetadata::new(ColumnId::from_index(1), "name", ColumnType::String),
            ColumnMetadata::new(ColumnId::from_index(2), "age", ColumnType::Integer),
        ])
        .with_lifecycle(lifecycle)
}
