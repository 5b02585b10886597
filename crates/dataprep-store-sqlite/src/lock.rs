// crates/dataprep-store-sqlite/src/lock.rs
// ============================================================================
// Module: SQLite Lock Manager
// Description: Lease-based dataset locks stored in the shared database.
// Purpose: Exclude concurrent analysis of one dataset across processes.
// Dependencies: dataprep-core, rusqlite
// ============================================================================

//! ## Overview
//! A lock is a row in `dataset_locks` keyed by dataset id and owned by a
//! random token. Acquisition clears an expired row and inserts its own in one
//! immediate transaction; contenders poll until the row disappears or its
//! lease runs out. The connection mutex is never held while sleeping.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use dataprep_core::DatasetId;
use dataprep_core::LockError;
use dataprep_core::LockLease;
use dataprep_core::LockManager;
use dataprep_core::Timestamp;
use dataprep_core::runtime::lock::lease_token;
use rusqlite::Connection;
use rusqlite::TransactionBehavior;
use rusqlite::params;

use crate::store::SqliteStoreError;
use crate::store::duration_millis;
use crate::store::lock_connection;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default interval between acquisition attempts.
pub const DEFAULT_LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// SECTION: Lock Manager
// ============================================================================

/// `SQLite`-backed lease lock manager.
///
/// # Invariants
/// - At most one unexpired row exists per dataset id.
/// - Renew and release only touch rows carrying the caller's token.
#[derive(Clone)]
pub struct SqliteLockManager {
    /// Shared `SQLite` connection.
    connection: Arc<Mutex<Connection>>,
    /// Lease duration granted on acquire and renew.
    lease: Duration,
    /// Sleep between contended acquisition attempts.
    poll_interval: Duration,
}

impl SqliteLockManager {
    /// Creates a lock manager over an open connection.
    pub(crate) const fn new(
        connection: Arc<Mutex<Connection>>,
        lease: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            connection,
            lease,
            poll_interval,
        }
    }

    /// Returns whether an unexpired lease exists for the key.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Backend`] when the query fails.
    pub fn is_locked(&self, key: &DatasetId) -> Result<bool, LockError> {
        let guard = lock_connection(&self.connection)?;
        let count: i64 = guard
            .query_row(
                "SELECT COUNT(*) FROM dataset_locks WHERE lock_key = ?1 AND expires_at > ?2",
                params![key.as_str(), Timestamp::now().as_unix_millis()],
                |row| row.get(0),
            )
            .map_err(SqliteStoreError::from)?;
        drop(guard);
        Ok(count > 0)
    }

    /// Makes a single acquisition attempt.
    fn try_acquire(&self, key: &DatasetId) -> Result<Option<LockLease>, SqliteStoreError> {
        let now = Timestamp::now().as_unix_millis();
        let expires_at = now.saturating_add(duration_millis(self.lease));
        let token = lease_token();
        let mut guard = lock_connection(&self.connection)?;
        let tx = guard.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "DELETE FROM dataset_locks WHERE lock_key = ?1 AND expires_at <= ?2",
            params![key.as_str(), now],
        )?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO dataset_locks (lock_key, token, expires_at) VALUES (?1, ?2, ?3)",
            params![key.as_str(), token, expires_at],
        )?;
        tx.commit()?;
        drop(guard);
        Ok((inserted == 1).then(|| LockLease {
            key: key.clone(),
            token,
            expires_at: Timestamp::from_unix_millis(expires_at),
        }))
    }
}

impl LockManager for SqliteLockManager {
    fn acquire(&self, key: &DatasetId, timeout: Option<Duration>) -> Result<LockLease, LockError> {
        let started = Instant::now();
        loop {
            if let Some(lease) = self.try_acquire(key)? {
                return Ok(lease);
            }
            let pause = match timeout {
                None => self.poll_interval,
                Some(limit) => {
                    let waited = started.elapsed();
                    if waited >= limit {
                        return Err(LockError::Timeout {
                            key: key.as_str().to_string(),
                            waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                        });
                    }
                    self.poll_interval.min(limit - waited)
                }
            };
            std::thread::sleep(pause);
        }
    }

    fn renew(&self, lease: &mut LockLease) -> Result<(), LockError> {
        let now = Timestamp::now().as_unix_millis();
        let expires_at = now.saturating_add(duration_millis(self.lease));
        let guard = lock_connection(&self.connection)?;
        let updated = guard
            .execute(
                "UPDATE dataset_locks SET expires_at = ?1 WHERE lock_key = ?2 AND token = ?3 AND \
                 expires_at > ?4",
                params![expires_at, lease.key.as_str(), lease.token, now],
            )
            .map_err(SqliteStoreError::from)?;
        drop(guard);
        if updated == 0 {
            return Err(LockError::LeaseLost(lease.key.as_str().to_string()));
        }
        lease.expires_at = Timestamp::from_unix_millis(expires_at);
        Ok(())
    }

    fn release(&self, lease: &LockLease) -> Result<(), LockError> {
        let guard = lock_connection(&self.connection)?;
        let deleted = guard
            .execute(
                "DELETE FROM dataset_locks WHERE lock_key = ?1 AND token = ?2",
                params![lease.key.as_str(), lease.token],
            )
            .map_err(SqliteStoreError::from)?;
        drop(guard);
        if deleted == 0 {
            return Err(LockError::LeaseLost(lease.key.as_str().to_string()));
        }
        Ok(())
    }
}
