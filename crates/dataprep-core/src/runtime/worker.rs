// crates/dataprep-core/src/runtime/worker.rs
// ============================================================================
// Module: Dataprep Analysis Worker
// Description: Per-message lock, load, analyze, persist, acknowledge cycle.
// Purpose: Advance a dataset through one analysis stage exactly once.
// Dependencies: thiserror, crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! An [`AnalysisWorker`] handles one analysis request at a time on the calling
//! thread. The dataset lock is held from the metadata read until the message
//! is settled, so two deliveries for the same dataset never interleave their
//! read-modify-write cycles. Every failure short of a channel protocol error
//! becomes an [`AnalysisOutcome`]: the message is acknowledged when retrying
//! cannot help and deferred when it can.
//!
//! The message's visibility window is restarted once the lock is held and
//! again right before persisting. If another delivery has taken over by then,
//! this one stops without writing or settling.
//!
//! Security posture: request properties are untrusted input; a request
//! without a usable dataset identifier is dropped without touching storage.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use thiserror::Error;

use crate::core::AnalysisRequest;
use crate::core::AnalysisStage;
use crate::core::DatasetId;
use crate::core::DatasetMetadata;
use crate::core::Destination;
use crate::core::LifecycleError;
use crate::core::Timestamp;
use crate::interfaces::AnalysisMessage;
use crate::interfaces::ChannelError;
use crate::interfaces::ContentError;
use crate::interfaces::LockManager;
use crate::interfaces::MessageChannel;
use crate::interfaces::MetadataStore;
use crate::interfaces::StoreError;
use crate::runtime::events::AnalysisEvent;
use crate::runtime::events::AnalysisEventSink;
use crate::runtime::events::EventLevel;
use crate::runtime::events::NoopEventSink;
use crate::runtime::lock::LockGuard;
use crate::runtime::lock::lock_scoped;
use crate::runtime::metrics::NoopMetrics;
use crate::runtime::metrics::WorkerMetricEvent;
use crate::runtime::metrics::WorkerMetrics;
use crate::runtime::quality::EnrichmentError;
use crate::runtime::schema::SchemaError;
use crate::runtime::scoring::ScoreError;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Worker timing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Maximum wait for the dataset lock; `None` waits indefinitely.
    pub lock_timeout: Option<Duration>,
    /// Redelivery delay when the stage precondition is not yet met.
    pub precondition_retry_delay: Duration,
    /// Redelivery delay after transient failures.
    pub retry_delay: Duration,
    /// Deliveries after which a message is dropped; `None` retries forever.
    pub max_deliveries: Option<u32>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: None,
            precondition_retry_delay: Duration::ZERO,
            retry_delay: Duration::from_secs(5),
            max_deliveries: None,
        }
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Why a message was acknowledged without completing the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Request carried no usable dataset identifier.
    Malformed,
    /// No metadata exists for the dataset.
    DatasetMissing,
    /// The dataset was removed while the stage was running.
    DatasetRemoved,
    /// The stage failed in a way no redelivery can fix.
    Unprocessable,
    /// The message exceeded the configured delivery limit.
    DeliveryLimit,
}

/// Why a message was left unacknowledged for redelivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferReason {
    /// The preceding stage has not completed.
    PreconditionNotMet,
    /// The dataset lock could not be acquired.
    LockUnavailable,
    /// The lock lease expired before the result was persisted.
    LeaseLost,
    /// The metadata store failed.
    StoreUnavailable,
    /// The analyzer failed.
    AnalysisFailed,
    /// The follow-up request could not be published.
    FollowUpFailed,
    /// The visibility window lapsed and a newer delivery owns the message;
    /// this delivery is abandoned without settling.
    DeliveryExpired,
}

/// Result of handling one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// Stage completed, persisted, and acknowledged.
    Completed {
        /// True when optional enrichment failed and was tolerated.
        degraded: bool,
    },
    /// Message acknowledged without completing the stage.
    Dropped(DropReason),
    /// Message left for redelivery.
    Deferred(DeferReason),
}

impl AnalysisOutcome {
    /// Returns a stable label for events and metrics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Completed {
                degraded: false,
            } => "completed",
            Self::Completed {
                degraded: true,
            } => "completed_degraded",
            Self::Dropped(DropReason::Malformed) => "dropped_malformed",
            Self::Dropped(DropReason::DatasetMissing) => "dropped_missing",
            Self::Dropped(DropReason::DatasetRemoved) => "dropped_removed",
            Self::Dropped(DropReason::Unprocessable) => "dropped_unprocessable",
            Self::Dropped(DropReason::DeliveryLimit) => "dropped_delivery_limit",
            Self::Deferred(DeferReason::PreconditionNotMet) => "deferred_precondition",
            Self::Deferred(DeferReason::LockUnavailable) => "deferred_lock",
            Self::Deferred(DeferReason::LeaseLost) => "deferred_lease_lost",
            Self::Deferred(DeferReason::StoreUnavailable) => "deferred_store",
            Self::Deferred(DeferReason::AnalysisFailed) => "deferred_analysis",
            Self::Deferred(DeferReason::FollowUpFailed) => "deferred_follow_up",
            Self::Deferred(DeferReason::DeliveryExpired) => "deferred_delivery_expired",
        }
    }

    /// Returns true when the message was acknowledged.
    #[must_use]
    pub const fn is_acknowledged(self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Dropped(_))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Stable error code for channel protocol failures.
pub const UNEXPECTED_CHANNEL_EXCEPTION: &str = "UNEXPECTED_CHANNEL_EXCEPTION";

/// Errors that escape a worker. Everything else is an [`AnalysisOutcome`].
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The channel rejected an acknowledgment or deferral.
    #[error("UNEXPECTED_CHANNEL_EXCEPTION: {0}")]
    ChannelProtocol(#[source] ChannelError),
}

impl WorkerError {
    /// Returns the stable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ChannelProtocol(_) => UNEXPECTED_CHANNEL_EXCEPTION,
        }
    }
}

/// Analyzer failures. Permanent ones drop the message, the rest leave it for
/// redelivery.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// Content could not be read.
    #[error(transparent)]
    Content(#[from] ContentError),
    /// Required enrichment failed.
    #[error("required enrichment failed: {0}")]
    Enrichment(#[from] EnrichmentError),
    /// A column could not be scored.
    #[error("scoring failed: {0}")]
    Scoring(#[from] ScoreError),
    /// Schema could not be inferred.
    #[error("schema inference failed: {0}")]
    Schema(#[from] SchemaError),
    /// Lifecycle transition was rejected.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl AnalyzeError {
    /// Returns true when the same content and metadata would fail again.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        match self {
            Self::Content(err) | Self::Enrichment(EnrichmentError::Content(err)) => {
                matches!(err, ContentError::InvalidLocation(_) | ContentError::TooLarge { .. })
            }
            Self::Schema(err) => matches!(err, SchemaError::MissingHeader),
            Self::Scoring(err) => matches!(err, ScoreError::MissingColumn(_) | ScoreError::Quality(_)),
            Self::Lifecycle(_) => true,
            Self::Enrichment(EnrichmentError::Engine(_)) => false,
        }
    }
}

// ============================================================================
// SECTION: Analyzer Trait
// ============================================================================

/// Stage-specific result details.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageReport {
    /// True when optional enrichment failed and was tolerated.
    pub degraded: bool,
}

/// Stage-specific analysis applied inside the worker's critical section.
pub trait DatasetAnalyzer: Send + Sync {
    /// Returns the lifecycle stage this analyzer completes.
    fn stage(&self) -> AnalysisStage;

    /// Returns the destination this analyzer consumes.
    fn destination(&self) -> Destination;

    /// Returns the destination to notify after the stage is persisted.
    fn follow_up(&self) -> Option<Destination> {
        None
    }

    /// Mutates the metadata copy with the stage's results.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzeError`] when the stage cannot complete; the metadata
    /// copy is then discarded.
    fn analyze(&self, metadata: &mut DatasetMetadata, events: &dyn AnalysisEventSink)
    -> Result<StageReport, AnalyzeError>;
}

// ============================================================================
// SECTION: Worker
// ============================================================================

/// Generic analysis worker over a store, lock manager, and stage analyzer.
pub struct AnalysisWorker<S, L, A> {
    /// Metadata store.
    store: S,
    /// Dataset lock manager.
    locks: L,
    /// Stage analyzer.
    analyzer: A,
    /// Timing configuration.
    config: WorkerConfig,
    /// Event sink.
    events: Arc<dyn AnalysisEventSink>,
    /// Metrics sink.
    metrics: Arc<dyn WorkerMetrics>,
    /// Channel for follow-up requests.
    follow_up: Option<Arc<dyn MessageChannel>>,
}

impl<S, L, A> AnalysisWorker<S, L, A>
where
    S: MetadataStore,
    L: LockManager,
    A: DatasetAnalyzer,
{
    /// Creates a worker with no-op events and metrics.
    #[must_use]
    pub fn new(store: S, locks: L, analyzer: A, config: WorkerConfig) -> Self {
        Self {
            store,
            locks,
            analyzer,
            config,
            events: Arc::new(NoopEventSink),
            metrics: Arc::new(NoopMetrics),
            follow_up: None,
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn AnalysisEventSink>) -> Self {
        self.events = events;
        self
    }

    /// Sets the metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn WorkerMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Sets the channel used to publish follow-up requests.
    #[must_use]
    pub fn with_follow_up_channel(mut self, channel: Arc<dyn MessageChannel>) -> Self {
        self.follow_up = Some(channel);
        self
    }

    /// Returns the stage analyzer.
    #[must_use]
    pub const fn analyzer(&self) -> &A {
        &self.analyzer
    }

    /// Returns the timing configuration.
    #[must_use]
    pub const fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Handles one message, settling it unless a channel error intervenes.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::ChannelProtocol`] when acknowledging or
    /// deferring fails. The dataset lock is released before returning.
    pub fn handle<M: AnalysisMessage + ?Sized>(&self, message: &mut M) -> Result<AnalysisOutcome, WorkerError> {
        let started = Instant::now();
        let result = self.dispatch(message);
        let outcome = match &result {
            Ok(outcome) => outcome.label(),
            Err(_) => "channel_error",
        };
        let metric = WorkerMetricEvent {
            stage: self.analyzer.stage(),
            outcome,
        };
        self.metrics.record_message(metric);
        self.metrics.record_latency(metric, started.elapsed());
        result
    }

    /// Resolves the dataset and runs the critical section under its lock.
    fn dispatch<M: AnalysisMessage + ?Sized>(&self, message: &mut M) -> Result<AnalysisOutcome, WorkerError> {
        let Some(dataset_id) = message.request().dataset_id() else {
            self.record(self.event(EventLevel::Warn, "message_dropped", "analysis request has no dataset id"));
            return self.acknowledge(message, AnalysisOutcome::Dropped(DropReason::Malformed));
        };
        if let Some(limit) = self.config.max_deliveries
            && message.delivery_count() > limit
        {
            self.record(
                self.event(EventLevel::Error, "delivery_limit_exceeded", "analysis request redelivered too often")
                    .with_dataset(&dataset_id)
                    .with_detail(format!("delivery {} exceeds limit {limit}", message.delivery_count())),
            );
            return self.acknowledge(message, AnalysisOutcome::Dropped(DropReason::DeliveryLimit));
        }
        if message.delivery_count() > 1 {
            self.record(
                self.event(EventLevel::Debug, "message_redelivered", "analysis request redelivered")
                    .with_dataset(&dataset_id)
                    .with_detail(format!("delivery {}", message.delivery_count())),
            );
        }

        let mut guard = match lock_scoped(&self.locks, &dataset_id, self.config.lock_timeout) {
            Ok(guard) => guard,
            Err(err) => {
                self.record(
                    self.event(EventLevel::Warn, "lock_unavailable", "dataset lock not acquired")
                        .with_dataset(&dataset_id)
                        .with_detail(err.to_string()),
                );
                return self.defer(message, self.config.retry_delay, DeferReason::LockUnavailable);
            }
        };
        let result = self.process(&dataset_id, &mut guard, message);
        if let Err(err) = guard.release() {
            self.record(
                self.event(EventLevel::Warn, "lock_release_failed", "dataset lock release failed")
                    .with_dataset(&dataset_id)
                    .with_detail(err.to_string()),
            );
        }
        result
    }

    /// Runs the stage while the dataset lock is held.
    fn process<M: AnalysisMessage + ?Sized>(
        &self,
        dataset_id: &DatasetId,
        guard: &mut LockGuard<'_, L>,
        message: &mut M,
    ) -> Result<AnalysisOutcome, WorkerError> {
        if let Some(outcome) = self.extend_visibility(dataset_id, message)? {
            return Ok(outcome);
        }
        let stage = self.analyzer.stage();
        let mut metadata = match self.store.get(dataset_id) {
            Ok(Some(metadata)) => metadata,
            Ok(None) => {
                self.record(
                    self.event(EventLevel::Info, "dataset_missing", "no metadata for dataset; dropping request")
                        .with_dataset(dataset_id),
                );
                return self.acknowledge(message, AnalysisOutcome::Dropped(DropReason::DatasetMissing));
            }
            Err(err) => {
                self.record(
                    self.event(EventLevel::Error, "store_read_failed", "metadata read failed")
                        .with_dataset(dataset_id)
                        .with_detail(err.to_string()),
                );
                return self.defer(message, self.config.retry_delay, DeferReason::StoreUnavailable);
            }
        };

        if !metadata.lifecycle().precondition_met(stage) {
            self.record(
                self.event(EventLevel::Debug, "precondition_not_met", "preceding stage incomplete; retrying later")
                    .with_dataset(dataset_id),
            );
            return self.defer(message, self.config.precondition_retry_delay, DeferReason::PreconditionNotMet);
        }

        let analyzed = self.analyzer.analyze(&mut metadata, self.events.as_ref()).and_then(|report| {
            metadata.lifecycle_mut().mark_complete(stage)?;
            Ok(report)
        });
        let report = match analyzed {
            Ok(report) => report,
            Err(err) if err.is_permanent() => {
                self.record(
                    self.event(EventLevel::Error, "analysis_rejected", "stage analysis cannot succeed; dropping")
                        .with_dataset(dataset_id)
                        .with_detail(err.to_string()),
                );
                return self.acknowledge(message, AnalysisOutcome::Dropped(DropReason::Unprocessable));
            }
            Err(err) => {
                self.record(
                    self.event(EventLevel::Error, "analysis_failed", "stage analysis failed")
                        .with_dataset(dataset_id)
                        .with_detail(err.to_string()),
                );
                return self.defer(message, self.config.retry_delay, DeferReason::AnalysisFailed);
            }
        };
        metadata.touch(Timestamp::now());

        if let Err(err) = guard.renew() {
            self.record(
                self.event(EventLevel::Warn, "lease_lost", "dataset lock lease expired before persisting")
                    .with_dataset(dataset_id)
                    .with_detail(err.to_string()),
            );
            return self.defer(message, self.config.retry_delay, DeferReason::LeaseLost);
        }
        if let Some(outcome) = self.extend_visibility(dataset_id, message)? {
            return Ok(outcome);
        }

        match self.store.update(&metadata) {
            Ok(()) => {}
            Err(StoreError::NotFound(_)) => {
                self.record(
                    self.event(EventLevel::Info, "dataset_removed", "dataset removed during analysis; dropping result")
                        .with_dataset(dataset_id),
                );
                return self.acknowledge(message, AnalysisOutcome::Dropped(DropReason::DatasetRemoved));
            }
            Err(err) => {
                self.record(
                    self.event(EventLevel::Error, "store_write_failed", "metadata write failed")
                        .with_dataset(dataset_id)
                        .with_detail(err.to_string()),
                );
                return self.defer(message, self.config.retry_delay, DeferReason::StoreUnavailable);
            }
        }

        if let Some(destination) = self.analyzer.follow_up()
            && let Some(channel) = &self.follow_up
            && let Err(err) = channel.publish(&AnalysisRequest::for_dataset(destination, dataset_id))
        {
            self.record(
                self.event(EventLevel::Error, "follow_up_failed", "follow-up request not published")
                    .with_dataset(dataset_id)
                    .with_detail(err.to_string()),
            );
            return self.defer(message, self.config.retry_delay, DeferReason::FollowUpFailed);
        }

        let outcome = AnalysisOutcome::Completed {
            degraded: report.degraded,
        };
        self.acknowledge(message, outcome)?;
        self.record(
            self.event(EventLevel::Info, "analysis_completed", "stage completed")
                .with_dataset(dataset_id)
                .with_outcome(outcome.label()),
        );
        Ok(outcome)
    }

    /// Restarts the message's visibility window. Returns an outcome when the
    /// delivery was superseded and must be abandoned unsettled.
    fn extend_visibility<M: AnalysisMessage + ?Sized>(
        &self,
        dataset_id: &DatasetId,
        message: &mut M,
    ) -> Result<Option<AnalysisOutcome>, WorkerError> {
        match message.extend() {
            Ok(()) => Ok(None),
            Err(ChannelError::StaleReceipt(_)) => {
                self.record(
                    self.event(EventLevel::Warn, "delivery_expired", "newer delivery owns the request; abandoning")
                        .with_dataset(dataset_id),
                );
                Ok(Some(AnalysisOutcome::Deferred(DeferReason::DeliveryExpired)))
            }
            Err(err) => Err(self.channel_failure(err)),
        }
    }

    /// Acknowledges the message and returns the outcome.
    fn acknowledge<M: AnalysisMessage + ?Sized>(
        &self,
        message: &mut M,
        outcome: AnalysisOutcome,
    ) -> Result<AnalysisOutcome, WorkerError> {
        message.acknowledge().map_err(|err| self.channel_failure(err))?;
        Ok(outcome)
    }

    /// Defers the message and returns the deferred outcome.
    fn defer<M: AnalysisMessage + ?Sized>(
        &self,
        message: &mut M,
        delay: Duration,
        reason: DeferReason,
    ) -> Result<AnalysisOutcome, WorkerError> {
        message.defer(delay).map_err(|err| self.channel_failure(err))?;
        Ok(AnalysisOutcome::Deferred(reason))
    }

    /// Records and wraps a channel protocol failure.
    fn channel_failure(&self, err: ChannelError) -> WorkerError {
        let err = WorkerError::ChannelProtocol(err);
        self.record(
            self.event(EventLevel::Error, "channel_failure", "message settlement failed")
                .with_outcome(err.code())
                .with_detail(err.to_string()),
        );
        err
    }

    /// Builds an event stamped with this worker's stage.
    fn event(&self, level: EventLevel, event: &'static str, message: &str) -> AnalysisEvent {
        AnalysisEvent::new(level, event, message).with_stage(self.analyzer.stage())
    }

    /// Records an event.
    fn record(&self, event: AnalysisEvent) {
        self.events.record(&event);
    }
}
