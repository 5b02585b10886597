// crates/dataprep-broker/tests/content/file_tests.rs
// ============================================================================
// Module: FileContentStore Tests
// Description: Directory-backed content resolution.
// ============================================================================

use dataprep_broker::BrokerError;
use dataprep_broker::FileContentStore;
use dataprep_core::ContentAccessor;
use dataprep_core::ContentError;
use tempfile::TempDir;

use crate::common::SAMPLE_CSV;
use crate::common::metadata;
use crate::common::read_all;

#[test]
fn file_store_reads_content_by_dataset_id() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("ds-1"), SAMPLE_CSV).unwrap();
    let store = FileContentStore::new(root.path()).unwrap();

    let reader = store.get(&metadata("ds-1")).unwrap();
    assert_eq!(read_all(reader), SAMPLE_CSV);
}

#[test]
fn file_store_reports_missing_content() {
    let root = TempDir::new().unwrap();
    let store = FileContentStore::new(root.path()).unwrap();
    assert!(matches!(store.get(&metadata("ds-404")), Err(ContentError::NotFound(_))));
}

#[test]
fn file_store_rejects_ids_that_are_not_a_segment() {
    let root = TempDir::new().unwrap();
    let store = FileContentStore::new(root.path().join(".")).unwrap();
    for id in ["..", "../etc/passwd", "a/b", "a\\b", ""] {
        let result = store.get(&metadata(id));
        assert!(matches!(result, Err(ContentError::InvalidLocation(_))), "id {id} accepted");
    }
}

#[cfg(unix)]
#[test]
fn file_store_rejects_symlink_escaping_root() {
    let outside = TempDir::new().unwrap();
    std::fs::write(outside.path().join("secret"), "x").unwrap();
    let root = TempDir::new().unwrap();
    std::os::unix::fs::symlink(outside.path().join("secret"), root.path().join("ds-1")).unwrap();
    let store = FileContentStore::new(root.path()).unwrap();

    assert!(matches!(store.get(&metadata("ds-1")), Err(ContentError::InvalidLocation(_))));
}

#[test]
fn file_store_requires_existing_root_directory() {
    let root = TempDir::new().unwrap();
    let file = root.path().join("plain");
    std::fs::write(&file, "x").unwrap();
    assert!(matches!(FileContentStore::new(&file), Err(BrokerError::InvalidPath(_))));
    assert!(matches!(FileContentStore::new(root.path().join("missing")), Err(BrokerError::InvalidPath(_))));
}
