// crates/dataprep-store-sqlite/src/lib.rs
// ============================================================================
// Module: Dataprep SQLite Backends
// Description: Metadata store, lock manager, and message channel on SQLite.
// Purpose: Provide durable, cross-process coordination for analysis workers.
// Dependencies: dataprep-core, rusqlite
// ============================================================================

//! ## Overview
//! Every backend in this crate shares one database file. Processes that open
//! the same file see the same metadata snapshots, the same lock leases, and
//! the same queued messages, which is what lets several worker processes
//! cooperate without a separate broker. Database contents are treated as
//! untrusted: snapshots are hash-verified on load and malformed queue rows
//! are discarded.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod channel;
pub mod lock;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use channel::SqliteMessageChannel;
pub use lock::DEFAULT_LOCK_POLL_INTERVAL;
pub use lock::SqliteLockManager;
pub use store::MAX_METADATA_BYTES;
pub use store::SqliteMetadataStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
