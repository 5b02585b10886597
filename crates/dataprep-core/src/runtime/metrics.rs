// crates/dataprep-core/src/runtime/metrics.rs
// ============================================================================
// Module: Dataprep Worker Metrics
// Description: Observability hooks for analysis message handling.
// Purpose: Provide outcome counters and latency buckets without hard deps.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! A thin metrics interface so deployments can plug in Prometheus or
//! OpenTelemetry. Labels are stable strings; dataset identifiers never become
//! labels.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::core::AnalysisStage;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default latency buckets in milliseconds for message handling histograms.
pub const WORKER_LATENCY_BUCKETS_MS: &[u64] =
    &[1, 5, 10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000, 30_000, 120_000];

// ============================================================================
// SECTION: Metric Events
// ============================================================================

/// Worker metric event payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerMetricEvent {
    /// Stage handled by the worker.
    pub stage: AnalysisStage,
    /// Outcome label of the handled message.
    pub outcome: &'static str,
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Metrics sink for analysis workers.
pub trait WorkerMetrics: Send + Sync {
    /// Records a handled-message counter event.
    fn record_message(&self, event: WorkerMetricEvent);
    /// Records the handling latency of a message.
    fn record_latency(&self, event: WorkerMetricEvent, latency: Duration);
}

/// No-op metrics sink.
pub struct NoopMetrics;

impl WorkerMetrics for NoopMetrics {
    fn record_message(&self, _event: WorkerMetricEvent) {}

    fn record_latency(&self, _event: WorkerMetricEvent, _latency: Duration) {}
}

/// Counting metrics sink, keyed by `stage/outcome`.
#[derive(Debug, Default)]
pub struct CountingMetrics {
    /// Counters by label.
    counts: Mutex<BTreeMap<String, u64>>,
}

impl CountingMetrics {
    /// Creates an empty counter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the counter for a stage and outcome label.
    #[must_use]
    pub fn count(&self, stage: AnalysisStage, outcome: &str) -> u64 {
        let key = format!("{stage}/{outcome}");
        self.counts.lock().ok().and_then(|counts| counts.get(&key).copied()).unwrap_or(0)
    }
}

impl WorkerMetrics for CountingMetrics {
    fn record_message(&self, event: WorkerMetricEvent) {
        if let Ok(mut counts) = self.counts.lock() {
            *counts.entry(format!("{}/{}", event.stage, event.outcome)).or_insert(0) += 1;
        }
    }

    fn record_latency(&self, _event: WorkerMetricEvent, _latency: Duration) {}
}
