// crates/dataprep-core/src/runtime/lock.rs
// ============================================================================
// Module: Dataprep Lock Runtime
// Description: Scoped lock guards and a process-local lease lock manager.
// Purpose: Guarantee lock release on every exit path of a critical section.
// Dependencies: rand, crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`lock_scoped`] acquires a lease and wraps it in a [`LockGuard`]. The guard
//! releases the lease when dropped, so early returns and unwinding cannot leak
//! a held lock; [`LockGuard::release`] is the explicit path that reports
//! release failures.
//!
//! [`InMemoryLockManager`] excludes threads of one process only. Deployments
//! with several worker processes need a lock manager backed by shared storage.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use crate::core::DatasetId;
use crate::core::Timestamp;
use crate::core::hashing::hex_encode;
use crate::interfaces::LockError;
use crate::interfaces::LockLease;
use crate::interfaces::LockManager;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default lease duration for lock grants.
pub const DEFAULT_LEASE: Duration = Duration::from_secs(300);

// ============================================================================
// SECTION: Lease Helpers
// ============================================================================

/// Generates a random 128-bit owner token.
#[must_use]
pub fn lease_token() -> String {
    let bytes: [u8; 16] = rand::random();
    hex_encode(&bytes)
}

/// Returns the wall-clock expiry for a lease starting now.
#[must_use]
pub fn lease_expiry(lease: Duration) -> Timestamp {
    let millis = i64::try_from(lease.as_millis()).unwrap_or(i64::MAX);
    Timestamp::from_unix_millis(Timestamp::now().as_unix_millis().saturating_add(millis))
}

// ============================================================================
// SECTION: Scoped Guard
// ============================================================================

/// Holds a lease for the lifetime of a critical section.
///
/// # Invariants
/// - The lease is released exactly once: explicitly via [`LockGuard::release`]
///   or implicitly on drop.
#[derive(Debug)]
pub struct LockGuard<'a, L: LockManager + ?Sized> {
    /// Manager that granted the lease.
    manager: &'a L,
    /// Held lease; `None` once released.
    lease: Option<LockLease>,
}

impl<L: LockManager + ?Sized> LockGuard<'_, L> {
    /// Returns the held lease.
    #[must_use]
    pub const fn lease(&self) -> Option<&LockLease> {
        self.lease.as_ref()
    }

    /// Extends the held lease.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::LeaseLost`] when the lease is no longer held.
    pub fn renew(&mut self) -> Result<(), LockError> {
        match self.lease.as_mut() {
            Some(lease) => self.manager.renew(lease),
            None => Err(LockError::LeaseLost("lease already released".to_string())),
        }
    }

    /// Releases the lease, reporting backend failures.
    ///
    /// # Errors
    ///
    /// Returns [`LockError`] when the manager fails to release the lease.
    pub fn release(mut self) -> Result<(), LockError> {
        match self.lease.take() {
            Some(lease) => self.manager.release(&lease),
            None => Ok(()),
        }
    }
}

impl<L: LockManager + ?Sized> Drop for LockGuard<'_, L> {
    fn drop(&mut self) {
        if let Some(lease) = self.lease.take() {
            let _ = self.manager.release(&lease);
        }
    }
}

/// Acquires a lock and returns a guard that releases it on drop.
///
/// # Errors
///
/// Returns [`LockError`] when acquisition fails or times out.
pub fn lock_scoped<'a, L: LockManager + ?Sized>(
    manager: &'a L,
    key: &DatasetId,
    timeout: Option<Duration>,
) -> Result<LockGuard<'a, L>, LockError> {
    let lease = manager.acquire(key, timeout)?;
    Ok(LockGuard {
        manager,
        lease: Some(lease),
    })
}

// ============================================================================
// SECTION: In-Memory Lock Manager
// ============================================================================

/// Current holder of an in-memory lock.
#[derive(Debug)]
struct Holder {
    /// Owner token.
    token: String,
    /// Monotonic expiry.
    deadline: Instant,
}

/// Shared state of the in-memory lock manager.
#[derive(Debug, Default)]
struct LockTable {
    /// Holders keyed by dataset identifier.
    holders: Mutex<HashMap<DatasetId, Holder>>,
    /// Signalled whenever a lock is released.
    released: Condvar,
}

/// Process-local lease lock manager; clones share the same lock table.
#[derive(Debug, Clone)]
pub struct InMemoryLockManager {
    /// Shared lock table.
    table: Arc<LockTable>,
    /// Lease duration for new grants.
    lease: Duration,
}

impl Default for InMemoryLockManager {
    fn default() -> Self {
        Self::new(DEFAULT_LEASE)
    }
}

impl InMemoryLockManager {
    /// Creates a lock manager granting leases of the given duration.
    #[must_use]
    pub fn new(lease: Duration) -> Self {
        Self {
            table: Arc::new(LockTable::default()),
            lease,
        }
    }

    /// Returns true when a live lease exists for the key.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Backend`] when the lock table is poisoned.
    pub fn is_locked(&self, key: &DatasetId) -> Result<bool, LockError> {
        let guard = self.table.holders.lock().map_err(|_| poisoned())?;
        Ok(guard.get(key).is_some_and(|holder| holder.deadline > Instant::now()))
    }
}

/// Error for a poisoned lock table.
fn poisoned() -> LockError {
    LockError::Backend("lock table mutex poisoned".to_string())
}

impl LockManager for InMemoryLockManager {
    fn acquire(&self, key: &DatasetId, timeout: Option<Duration>) -> Result<LockLease, LockError> {
        let started = Instant::now();
        let deadline = timeout.map(|timeout| started + timeout);
        let mut guard = self.table.holders.lock().map_err(|_| poisoned())?;
        loop {
            let now = Instant::now();
            let wait_until = match guard.get(key) {
                Some(holder) if holder.deadline > now => holder.deadline,
                _ => {
                    let token = lease_token();
                    guard.insert(key.clone(), Holder {
                        token: token.clone(),
                        deadline: now + self.lease,
                    });
                    drop(guard);
                    return Ok(LockLease {
                        key: key.clone(),
                        token,
                        expires_at: lease_expiry(self.lease),
                    });
                }
            };
            let wait_until = match deadline {
                Some(deadline) if deadline <= now => {
                    return Err(LockError::Timeout {
                        key: key.to_string(),
                        waited_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    });
                }
                Some(deadline) => wait_until.min(deadline),
                None => wait_until,
            };
            let (next, _) = self
                .table
                .released
                .wait_timeout(guard, wait_until.saturating_duration_since(now))
                .map_err(|_| poisoned())?;
            guard = next;
        }
    }

    fn renew(&self, lease: &mut LockLease) -> Result<(), LockError> {
        let mut guard = self.table.holders.lock().map_err(|_| poisoned())?;
        let now = Instant::now();
        match guard.get_mut(&lease.key) {
            Some(holder) if holder.token == lease.token && holder.deadline > now => {
                holder.deadline = now + self.lease;
                drop(guard);
                lease.expires_at = lease_expiry(self.lease);
                Ok(())
            }
            _ => Err(LockError::LeaseLost(lease.key.to_string())),
        }
    }

    fn release(&self, lease: &LockLease) -> Result<(), LockError> {
        let mut guard = self.table.holders.lock().map_err(|_| poisoned())?;
        let held = guard.get(&lease.key).is_some_and(|holder| holder.token == lease.token);
        if held {
            guard.remove(&lease.key);
        }
        drop(guard);
        self.table.released.notify_all();
        if held { Ok(()) } else { Err(LockError::LeaseLost(lease.key.to_string())) }
    }
}
