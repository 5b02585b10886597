// crates/dataprep-core/tests/common/mod.rs
// ============================================================================
// Module: Worker Test Helpers
// Description: Scripted messages, fixtures, and instrumented collaborators.
// Purpose: Share worker scaffolding across integration suites.
// ============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]
#![allow(clippy::unwrap_used, reason = "Test helpers unwrap deterministic fixtures.")]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use dataprep_core::AnalysisEngine;
use dataprep_core::AnalysisMessage;
use dataprep_core::AnalysisRequest;
use dataprep_core::ChannelError;
use dataprep_core::ColumnId;
use dataprep_core::ColumnMetadata;
use dataprep_core::ColumnType;
use dataprep_core::DatasetId;
use dataprep_core::DatasetMetadata;
use dataprep_core::Destination;
use dataprep_core::EngineError;
use dataprep_core::EngineRequest;
use dataprep_core::InMemoryLockManager;
use dataprep_core::Lifecycle;
use dataprep_core::LockError;
use dataprep_core::LockLease;
use dataprep_core::LockManager;
use dataprep_core::Timestamp;

// ============================================================================
// SECTION: Scripted Message
// ============================================================================

/// How a scripted message answers settlement calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Settlement succeeds.
    Accept,
    /// Settlement fails with a backend error.
    Fail,
}

/// In-process message that records how the worker settled it.
#[derive(Debug)]
pub struct ScriptedMessage {
    pub request: AnalysisRequest,
    pub settlement: Settlement,
    pub acknowledged: usize,
    pub deferred: Vec<Duration>,
    pub deliveries: u32,
    pub superseded: bool,
    pub extensions: usize,
}

impl ScriptedMessage {
    pub fn new(request: AnalysisRequest) -> Self {
        Self {
            request,
            settlement: Settlement::Accept,
            acknowledged: 0,
            deferred: Vec::new(),
            deliveries: 1,
            superseded: false,
            extensions: 0,
        }
    }

    pub fn quality(id: &str) -> Self {
        Self::new(AnalysisRequest::for_dataset(Destination::QualityAnalysis, &DatasetId::new(id)))
    }

    pub fn schema(id: &str) -> Self {
        Self::new(AnalysisRequest::for_dataset(Destination::SchemaAnalysis, &DatasetId::new(id)))
    }

    pub const fn failing(mut self) -> Self {
        self.settlement = Settlement::Fail;
        self
    }

    pub const fn delivered(mut self, deliveries: u32) -> Self {
        self.deliveries = deliveries;
        self
    }

    /// Marks the delivery as replaced by a newer one, so extensions fail.
    pub const fn superseded(mut self) -> Self {
        self.superseded = true;
        self
    }

    pub fn was_acknowledged(&self) -> bool {
        self.acknowledged > 0
    }
}

impl AnalysisMessage for ScriptedMessage {
    fn request(&self) -> &AnalysisRequest {
        &self.request
    }

    fn delivery_count(&self) -> u32 {
        self.deliveries
    }

    fn extend(&mut self) -> Result<(), ChannelError> {
        if self.superseded {
            return Err(ChannelError::StaleReceipt(dataprep_core::MessageId::new(1)));
        }
        self.extensions += 1;
        Ok(())
    }

    fn acknowledge(&mut self) -> Result<(), ChannelError> {
        if self.settlement == Settlement::Fail {
            return Err(ChannelError::Backend("broker connection reset".to_string()));
        }
        self.acknowledged += 1;
        Ok(())
    }

    fn defer(&mut self, delay: Duration) -> Result<(), ChannelError> {
        if self.settlement == Settlement::Fail {
            return Err(ChannelError::Backend("broker connection reset".to_string()));
        }
        self.deferred.push(delay);
        Ok(())
    }
}

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Content used by quality fixtures.
pub const SAMPLE_CSV: &str = "id;name;age\n1;alice;34\n2;bob;\n3;carol;x\n";

/// Three columns matching [`SAMPLE_CSV`].
pub fn sample_columns() -> Vec<ColumnMetadata> {
    vec![
        ColumnMetadata::new(ColumnId::from_index(0), "id", ColumnType::Integer),
        ColumnMetadata::new(ColumnId::from_index(1), "name", ColumnType::String),
        ColumnMetadata::new(ColumnId::from_index(2), "age", ColumnType::Integer),
    ]
}

/// Metadata with the schema stage complete.
pub fn schema_analyzed(id: &str) -> DatasetMetadata {
    let mut lifecycle = Lifecycle::new();
    lifecycle.mark_complete(dataprep_core::AnalysisStage::Schema).unwrap();
    DatasetMetadata::new(DatasetId::new(id), "customers", Timestamp::from_unix_millis(1_000))
        .with_columns(sample_columns())
        .with_lifecycle(lifecycle)
}

/// Metadata with no stage complete.
pub fn fresh(id: &str) -> DatasetMetadata {
    DatasetMetadata::new(DatasetId::new(id), "customers", Timestamp::from_unix_millis(1_000))
        .with_columns(sample_columns())
}

// ============================================================================
// SECTION: Instrumented Collaborators
// ============================================================================

/// Engine double that records calls and returns a fixed result.
pub struct RecordingEngine {
    pub calls: AtomicUsize,
    pub result: Result<String, String>,
    pub seen: Mutex<Vec<(PathBuf, char, String, bool)>>,
    pub delay: Duration,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl RecordingEngine {
    pub fn ok(result: &str) -> Self {
        Self::with_result(Ok(result.to_string()))
    }

    pub fn failing(message: &str) -> Self {
        Self::with_result(Err(message.to_string()))
    }

    fn with_result(result: Result<String, String>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            result,
            seen: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub const fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AnalysisEngine for RecordingEngine {
    fn analyze(&self, request: &EngineRequest<'_>) -> Result<String, EngineError> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        let content = std::fs::read_to_string(request.content_path).unwrap_or_default();
        self.seen.lock().unwrap().push((
            request.content_path.to_path_buf(),
            request.delimiter,
            content,
            request.content_path.exists(),
        ));
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.result.clone().map_err(EngineError::Failed)
    }
}

/// Lock manager wrapper counting acquisitions and releases.
#[derive(Clone, Default)]
pub struct CountingLocks {
    pub inner: InMemoryLockManager,
    pub acquired: Arc<AtomicUsize>,
    pub released: Arc<AtomicUsize>,
}

impl CountingLocks {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl LockManager for CountingLocks {
    fn acquire(&self, key: &DatasetId, timeout: Option<Duration>) -> Result<LockLease, LockError> {
        let lease = self.inner.acquire(key, timeout)?;
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(lease)
    }

    fn renew(&self, lease: &mut LockLease) -> Result<(), LockError> {
        self.inner.renew(lease)
    }

    fn release(&self, lease: &LockLease) -> Result<(), LockError> {
        self.released.fetch_add(1, Ordering::SeqCst);
        self.inner.release(lease)
    }
}
