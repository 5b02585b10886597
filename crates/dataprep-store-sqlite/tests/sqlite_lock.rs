// crates/dataprep-store-sqlite/tests/sqlite_lock.rs
// ============================================================================
// Module: SQLite Lock Manager Tests
// Description: Lease locks shared through one database file.
// Purpose: Validate exclusion across handles and recovery of expired leases.
// Dependencies: dataprep-store-sqlite, dataprep-core, tempfile
// ============================================================================
//! ## Overview
//! Each test opens independent store handles on the same file, standing in
//! for separate worker processes.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::time::Duration;

use dataprep_core::DatasetId;
use dataprep_core::LockError;
use dataprep_core::LockManager;
use dataprep_store_sqlite::SqliteLockManager;
use tempfile::TempDir;

mod common;
use common::store_for;

/// Opens a lock manager on its own connection to the shared file.
fn locks(temp: &TempDir, lease: Duration) -> SqliteLockManager {
    store_for(&temp.path().join("store.sqlite")).lock_manager(lease, Duration::from_millis(5))
}

#[test]
fn sqlite_lock_acquire_and_release() {
    let temp = TempDir::new().unwrap();
    let manager = locks(&temp, Duration::from_secs(30));
    let key = DatasetId::new("ds-1");

    let lease = manager.acquire(&key, Some(Duration::from_secs(1))).unwrap();
    assert!(manager.is_locked(&key).unwrap());
    manager.release(&lease).unwrap();
    assert!(!manager.is_locked(&key).unwrap());
    assert!(matches!(manager.release(&lease), Err(LockError::LeaseLost(_))));
}

#[test]
fn sqlite_lock_excludes_second_handle() {
    let temp = TempDir::new().unwrap();
    let first = locks(&temp, Duration::from_secs(30));
    let second = locks(&temp, Duration::from_secs(30));
    let key = DatasetId::new("ds-1");

    let lease = first.acquire(&key, None).unwrap();
    let result = second.acquire(&key, Some(Duration::from_millis(50)));
    assert!(matches!(result, Err(LockError::Timeout { .. })));

    let other = second.acquire(&DatasetId::new("ds-2"), Some(Duration::from_millis(50))).unwrap();
    second.release(&other).unwrap();
    first.release(&lease).unwrap();
}

#[test]
fn sqlite_lock_waiter_proceeds_after_release() {
    let temp = TempDir::new().unwrap();
    let first = locks(&temp, Duration::from_secs(30));
    let second = locks(&temp, Duration::from_secs(30));
    let key = DatasetId::new("ds-1");

    let lease = first.acquire(&key, None).unwrap();
    let waiter = {
        let key = key.clone();
        std::thread::spawn(move || {
            let lease = second.acquire(&key, Some(Duration::from_secs(5))).unwrap();
            second.release(&lease).unwrap();
        })
    };
    std::thread::sleep(Duration::from_millis(50));
    first.release(&lease).unwrap();

    waiter.join().unwrap();
    assert!(!first.is_locked(&key).unwrap());
}

#[test]
fn sqlite_lock_recovers_expired_lease() {
    let temp = TempDir::new().unwrap();
    let crashed = locks(&temp, Duration::from_millis(20));
    let survivor = locks(&temp, Duration::from_secs(30));
    let key = DatasetId::new("ds-1");

    let mut stale = crashed.acquire(&key, None).unwrap();
    std::thread::sleep(Duration::from_millis(40));
    let lease = survivor.acquire(&key, Some(Duration::from_secs(1))).unwrap();

    assert!(matches!(crashed.renew(&mut stale), Err(LockError::LeaseLost(_))));
    assert!(matches!(crashed.release(&stale), Err(LockError::LeaseLost(_))));
    assert!(survivor.is_locked(&key).unwrap());
    survivor.release(&lease).unwrap();
}

#[test]
fn sqlite_lock_renew_extends_expiry() {
    let temp = TempDir::new().unwrap();
    let manager = locks(&temp, Duration::from_secs(30));
    let key = DatasetId::new("ds-1");

    let mut lease = manager.acquire(&key, None).unwrap();
    let before = lease.expires_at;
    std::thread::sleep(Duration::from_millis(5));
    manager.renew(&mut lease).unwrap();
    assert!(lease.expires_at > before);
    manager.release(&lease).unwrap();
}
