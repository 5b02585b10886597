// crates/dataprep-core/src/interfaces/mod.rs
// ============================================================================
// Module: Dataprep Interfaces
// Description: Backend-agnostic interfaces for storage, locking, content,
//              analysis engines, and messaging.
// Purpose: Define the contract surfaces used by the analysis workers.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Interfaces decouple the workers from the infrastructure they run on. Every
//! backend reports failures through the error enum of the interface it
//! implements, so workers can classify failures (retryable or not) without
//! knowing which backend produced them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::AnalysisRequest;
use crate::core::DatasetId;
use crate::core::DatasetMetadata;
use crate::core::Destination;
use crate::core::MessageId;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Metadata Store
// ============================================================================

/// Metadata store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("metadata store io error: {0}")]
    Io(String),
    /// Stored data fails integrity checks.
    #[error("metadata store corruption: {0}")]
    Corrupt(String),
    /// Stored data version is incompatible.
    #[error("metadata store version mismatch: {0}")]
    VersionMismatch(String),
    /// Data is invalid.
    #[error("metadata store invalid data: {0}")]
    Invalid(String),
    /// Record does not exist (conditional update on a removed dataset).
    #[error("dataset not found: {0}")]
    NotFound(String),
    /// Store reported an error.
    #[error("metadata store error: {0}")]
    Store(String),
}

/// Durable mapping from dataset identifier to metadata.
///
/// Implementations must be safe for concurrent use across different dataset
/// identifiers without external locking.
pub trait MetadataStore: Send + Sync {
    /// Loads metadata by dataset identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn get(&self, id: &DatasetId) -> Result<Option<DatasetMetadata>, StoreError>;

    /// Inserts or overwrites metadata by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when saving fails.
    fn add(&self, metadata: &DatasetMetadata) -> Result<(), StoreError>;

    /// Overwrites metadata only if a record with the same identifier exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the record was removed, or another
    /// [`StoreError`] when saving fails.
    fn update(&self, metadata: &DatasetMetadata) -> Result<(), StoreError>;

    /// Removes metadata. Returns `true` when a record was removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when removal fails.
    fn remove(&self, id: &DatasetId) -> Result<bool, StoreError>;

    /// Lists stored dataset identifiers in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn list(&self) -> Result<Vec<DatasetId>, StoreError>;
}

// ============================================================================
// SECTION: Distributed Lock
// ============================================================================

/// Lock manager errors.
#[derive(Debug, Error)]
pub enum LockError {
    /// Acquisition did not succeed within the configured timeout.
    #[error("timed out after {waited_ms} ms waiting for lock on {key}")]
    Timeout {
        /// Lock key.
        key: String,
        /// Time spent waiting in milliseconds.
        waited_ms: u64,
    },
    /// The lease expired and is no longer held by this owner.
    #[error("lock lease lost for {0}")]
    LeaseLost(String),
    /// Lock backend reported an error.
    #[error("lock backend error: {0}")]
    Backend(String),
}

/// Grant returned by a successful acquisition.
///
/// # Invariants
/// - `token` is unique per acquisition; renew and release match on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockLease {
    /// Locked dataset identifier.
    pub key: DatasetId,
    /// Owner token for this acquisition.
    pub token: String,
    /// Lease expiry; the lease may be taken over after this instant.
    pub expires_at: Timestamp,
}

/// Mutual exclusion keyed by dataset identifier.
///
/// Implementations backed by shared storage exclude holders in other
/// processes, not just other threads. Leases expire so that a crashed holder
/// cannot stall a dataset forever.
pub trait LockManager: Send + Sync {
    /// Blocks until the lock is granted or `timeout` elapses (`None` waits
    /// indefinitely).
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Timeout`] when the timeout elapses, or
    /// [`LockError::Backend`] when the backend fails.
    fn acquire(&self, key: &DatasetId, timeout: Option<Duration>) -> Result<LockLease, LockError>;

    /// Extends a held lease.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::LeaseLost`] when the lease is no longer held.
    fn renew(&self, lease: &mut LockLease) -> Result<(), LockError>;

    /// Releases a held lease.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::LeaseLost`] when the lease had already been taken
    /// over, or [`LockError::Backend`] when the backend fails.
    fn release(&self, lease: &LockLease) -> Result<(), LockError>;
}

// ============================================================================
// SECTION: Content Accessor
// ============================================================================

/// Content access errors.
#[derive(Debug, Error)]
pub enum ContentError {
    /// Content for the dataset does not exist.
    #[error("content not found: {0}")]
    NotFound(String),
    /// Content location is invalid or escapes its root.
    #[error("invalid content location: {0}")]
    InvalidLocation(String),
    /// I/O failure while reading or materializing content.
    #[error("content io failure: {0}")]
    Io(String),
    /// Remote content service failed.
    #[error("content http failure: {0}")]
    Http(String),
    /// Content exceeded the configured byte limit.
    #[error("content exceeds size limit: read at least {read_at_least} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: u64,
        /// Bytes read before giving up; a lower bound on the content size.
        read_at_least: u64,
    },
}

/// Read-only streaming access to a dataset's raw content.
pub trait ContentAccessor: Send + Sync {
    /// Opens the raw content of a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError`] when the content cannot be opened.
    fn get(&self, metadata: &DatasetMetadata) -> Result<Box<dyn Read + Send>, ContentError>;
}

// ============================================================================
// SECTION: Analysis Engine
// ============================================================================

/// Output format requested from the analysis engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// JSON document.
    #[default]
    Json,
}

impl OutputFormat {
    /// Returns the engine's label for the format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
        }
    }
}

/// Fixed parameters passed on every engine invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineParameters {
    /// Parallelism hint understood by the engine (e.g. `local[4]`).
    pub concurrency_hint: String,
    /// Row offset where sampling starts.
    pub start_offset: u64,
    /// Sampling threshold.
    pub sample_limit: u64,
    /// Requested output format.
    pub output_format: OutputFormat,
}

impl Default for EngineParameters {
    fn default() -> Self {
        Self {
            concurrency_hint: "local[4]".to_string(),
            start_offset: 0,
            sample_limit: 2,
            output_format: OutputFormat::Json,
        }
    }
}

/// A single engine invocation.
#[derive(Debug, Clone, Copy)]
pub struct EngineRequest<'a> {
    /// Fixed engine parameters.
    pub parameters: &'a EngineParameters,
    /// Field delimiter of the materialized content.
    pub delimiter: char,
    /// Path of the materialized content snapshot.
    pub content_path: &'a Path,
}

/// Analysis engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// I/O failure talking to the engine.
    #[error("engine io failure: {0}")]
    Io(String),
    /// Engine is disabled or unreachable.
    #[error("engine unavailable: {0}")]
    Unavailable(String),
    /// Engine ran but reported failure.
    #[error("engine failed: {0}")]
    Failed(String),
}

/// Synchronous external statistics computation.
pub trait AnalysisEngine: Send + Sync {
    /// Runs the analysis and returns the serialized result.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the engine call fails.
    fn analyze(&self, request: &EngineRequest<'_>) -> Result<String, EngineError>;
}

// ============================================================================
// SECTION: Message Channel
// ============================================================================

/// Message channel errors.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Channel I/O error.
    #[error("channel io error: {0}")]
    Io(String),
    /// Receipt refers to an older delivery of the message.
    #[error("stale delivery receipt for message {0}")]
    StaleReceipt(MessageId),
    /// The delivery was already acknowledged or deferred.
    #[error("delivery for message {0} already settled")]
    AlreadySettled(MessageId),
    /// Stored message is invalid.
    #[error("invalid channel message: {0}")]
    Invalid(String),
    /// Channel backend reported an error.
    #[error("channel backend error: {0}")]
    Backend(String),
}

/// Identifies one delivery of a message.
///
/// # Invariants
/// - `token` changes on every redelivery, so a consumer whose visibility
///   window lapsed cannot settle the newer delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Message identifier.
    pub message_id: MessageId,
    /// Delivery token.
    pub token: String,
}

/// A message handed to a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    /// Delivery receipt used to settle the message.
    pub receipt: DeliveryReceipt,
    /// Request payload.
    pub request: AnalysisRequest,
    /// Number of times the message has been delivered, including this one.
    pub delivery_count: u32,
}

/// At-least-once message queue with explicit acknowledgment.
pub trait MessageChannel: Send + Sync {
    /// Publishes a request.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when the request cannot be enqueued.
    fn publish(&self, request: &AnalysisRequest) -> Result<MessageId, ChannelError>;

    /// Receives the next visible message for a destination, hiding it for the
    /// channel's visibility timeout. Returns `None` when nothing is visible.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when the channel cannot be read.
    fn receive(&self, destination: Destination) -> Result<Option<ReceivedMessage>, ChannelError>;

    /// Acknowledges a delivery, removing the message permanently.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::StaleReceipt`] when the receipt is outdated.
    fn acknowledge(&self, receipt: &DeliveryReceipt) -> Result<(), ChannelError>;

    /// Withholds acknowledgment and makes the message visible again after `delay`.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::StaleReceipt`] when the receipt is outdated.
    fn defer(&self, receipt: &DeliveryReceipt, delay: Duration) -> Result<(), ChannelError>;

    /// Restarts the visibility window of a delivery that is still being
    /// processed, hiding it for another full visibility timeout from now.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::StaleReceipt`] when the window already lapsed
    /// and the message was settled or delivered again.
    fn extend(&self, receipt: &DeliveryReceipt) -> Result<(), ChannelError>;
}

/// A message as seen by an analysis worker.
///
/// # Invariants
/// - At most one of [`AnalysisMessage::acknowledge`] or
///   [`AnalysisMessage::defer`] succeeds per delivery.
pub trait AnalysisMessage {
    /// Returns the request payload.
    fn request(&self) -> &AnalysisRequest;

    /// Returns how many times the message has been delivered.
    fn delivery_count(&self) -> u32 {
        1
    }

    /// Acknowledges the message.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when the channel rejects the acknowledgment.
    fn acknowledge(&mut self) -> Result<(), ChannelError>;

    /// Leaves the message unacknowledged, asking for redelivery after `delay`.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when the channel rejects the deferral.
    fn defer(&mut self, delay: Duration) -> Result<(), ChannelError>;

    /// Keeps the message hidden from other consumers while work continues.
    /// Messages without a visibility window accept every extension.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::StaleReceipt`] when another delivery of the
    /// message superseded this one.
    fn extend(&mut self) -> Result<(), ChannelError> {
        Ok(())
    }
}
