// crates/dataprep-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Metadata Store Tests
// Description: Integration tests for the SQLite metadata store.
// Purpose: Validate snapshot persistence, integrity checks, and retention.
// Dependencies: dataprep-store-sqlite, dataprep-core, rusqlite, tempfile
// ============================================================================
//! ## Overview
//! Exercises the durable store against scratch database files: round trips,
//! conditional updates, deletion, tamper detection, and schema versioning.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;

use dataprep_core::AnalysisStage;
use dataprep_core::DatasetId;
use dataprep_core::MetadataStore;
use dataprep_core::Quality;
use dataprep_core::StoreError;
use dataprep_store_sqlite::SqliteMetadataStore;
use dataprep_store_sqlite::SqliteStoreConfig;
use dataprep_store_sqlite::SqliteStoreError;
use tempfile::TempDir;

mod common;
use common::metadata;
use common::store_for;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn sqlite_store_roundtrip() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    let mut record = metadata("ds-1", &[AnalysisStage::Schema]);
    record.columns_mut()[0].quality = Quality::new(60, 30, 10).unwrap();
    store.add(&record).unwrap();
    assert_eq!(store.get(&DatasetId::new("ds-1")).unwrap(), Some(record));
}

#[test]
fn sqlite_store_returns_none_for_missing_dataset() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    assert!(store.get(&DatasetId::new("missing")).unwrap().is_none());
}

#[test]
fn sqlite_store_persists_across_instances() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("store.sqlite");
    let record = metadata("ds-1", &[]);
    {
        let store = store_for(&path);
        store.add(&record).unwrap();
    }
    let store = store_for(&path);
    assert_eq!(store.get(&DatasetId::new("ds-1")).unwrap(), Some(record));
}

#[test]
fn sqlite_store_update_requires_existing_record() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    let record = metadata("ds-1", &[AnalysisStage::Schema]);

    let result = store.update(&record);
    assert!(matches!(result, Err(StoreError::NotFound(_))));
    assert!(store.get(record.id()).unwrap().is_none());

    store.add(&record).unwrap();
    let updated = metadata("ds-1", &[AnalysisStage::Schema, AnalysisStage::Quality]);
    store.update(&updated).unwrap();
    assert_eq!(store.get(record.id()).unwrap(), Some(updated));
    assert_eq!(store.versions(record.id()).unwrap(), 2);
}

#[test]
fn sqlite_store_remove_drops_history_and_blocks_update() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    let record = metadata("ds-1", &[]);
    store.add(&record).unwrap();
    store.add(&record).unwrap();

    assert!(store.remove(record.id()).unwrap());
    assert!(!store.remove(record.id()).unwrap());
    assert_eq!(store.versions(record.id()).unwrap(), 0);
    assert!(matches!(store.update(&record), Err(StoreError::NotFound(_))));
}

#[test]
fn sqlite_store_lists_ids_in_order() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    for id in ["ds-3", "ds-1", "ds-2"] {
        store.add(&metadata(id, &[])).unwrap();
    }
    let ids: Vec<String> =
        store.list().unwrap().iter().map(|id| id.as_str().to_string()).collect();
    assert_eq!(ids, ["ds-1", "ds-2", "ds-3"]);
}

#[test]
fn sqlite_store_detects_corrupt_hash() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let store = store_for(&path);
    store.add(&metadata("ds-1", &[])).unwrap();
    {
        let connection = rusqlite::Connection::open(&path).unwrap();
        connection
            .execute(
                "UPDATE dataset_versions SET metadata_hash = 'bad' WHERE dataset_id = ?1",
                rusqlite::params!["ds-1"],
            )
            .unwrap();
    }
    let result = store.get(&DatasetId::new("ds-1"));
    assert!(matches!(result, Err(StoreError::Corrupt(_))));
}

#[test]
fn sqlite_store_rejects_payload_for_other_dataset() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let store = store_for(&path);
    store.add(&metadata("ds-1", &[])).unwrap();
    store.add(&metadata("ds-2", &[])).unwrap();
    {
        let connection = rusqlite::Connection::open(&path).unwrap();
        connection
            .execute(
                "UPDATE dataset_versions SET (metadata_json, metadata_hash) = (SELECT \
                 metadata_json, metadata_hash FROM dataset_versions WHERE dataset_id = 'ds-2') \
                 WHERE dataset_id = 'ds-1'",
                rusqlite::params![],
            )
            .unwrap();
    }
    let result = store.get(&DatasetId::new("ds-1"));
    assert!(matches!(result, Err(StoreError::Invalid(_))));
}

#[test]
fn sqlite_store_rejects_unknown_hash_algorithm() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let store = store_for(&path);
    store.add(&metadata("ds-1", &[])).unwrap();
    {
        let connection = rusqlite::Connection::open(&path).unwrap();
        connection
            .execute("UPDATE dataset_versions SET hash_algorithm = 'md5'", rusqlite::params![])
            .unwrap();
    }
    let result = store.get(&DatasetId::new("ds-1"));
    assert!(matches!(result, Err(StoreError::Invalid(_))));
}

#[test]
fn sqlite_store_enforces_max_versions() {
    let temp = TempDir::new().unwrap();
    let mut config = SqliteStoreConfig::for_path(temp.path().join("store.sqlite"));
    config.max_versions = Some(2);
    let store = SqliteMetadataStore::new(config).unwrap();
    let record = metadata("ds-1", &[]);
    for _ in 0 .. 3 {
        store.add(&record).unwrap();
    }
    assert_eq!(store.versions(record.id()).unwrap(), 2);
    assert_eq!(store.get(record.id()).unwrap(), Some(record));
}

#[test]
fn sqlite_store_rejects_zero_max_versions() {
    let temp = TempDir::new().unwrap();
    let mut config = SqliteStoreConfig::for_path(temp.path().join("store.sqlite"));
    config.max_versions = Some(0);
    assert!(matches!(SqliteMetadataStore::new(config), Err(SqliteStoreError::Invalid(_))));
}

#[test]
fn sqlite_store_rejects_version_mismatch() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let _store = store_for(&path);

    let connection = rusqlite::Connection::open(&path).unwrap();
    connection.execute("UPDATE store_meta SET version = 999", rusqlite::params![]).unwrap();

    let result = SqliteMetadataStore::new(SqliteStoreConfig::for_path(path));
    assert!(matches!(result, Err(SqliteStoreError::VersionMismatch(_))));
}

#[test]
fn sqlite_store_rejects_directory_path() {
    let temp = TempDir::new().unwrap();
    let result = SqliteMetadataStore::new(SqliteStoreConfig::for_path(temp.path()));
    assert!(matches!(result, Err(SqliteStoreError::Invalid(_))));
}

#[test]
fn sqlite_store_rejects_overlong_path_component() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("a".repeat(300)).join("store.sqlite");
    let result = SqliteMetadataStore::new(SqliteStoreConfig::for_path(path));
    assert!(matches!(result, Err(SqliteStoreError::Invalid(_))));
}

#[test]
fn sqlite_store_allows_concurrent_writes() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(store_for(&temp.path().join("store.sqlite")));
    let handles: Vec<_> = (0 .. 10)
        .map(|_| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || store.add(&metadata("ds-1", &[])).unwrap())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(store.versions(&DatasetId::new("ds-1")).unwrap(), 10);
}
