// crates/dataprep-core/src/runtime/events.rs
// ============================================================================
// Module: Dataprep Analysis Events
// Description: Structured JSON-line events emitted by analysis workers.
// Purpose: Record worker decisions without a hard logging dependency.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Workers report every decision (dropped, deferred, completed, enrichment
//! failures) as an [`AnalysisEvent`]. Sinks serialize events as JSON lines so
//! deployments can route them into whichever log pipeline they already run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;

use crate::core::AnalysisStage;
use crate::core::DatasetId;
use crate::core::MessageId;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Severity of an analysis event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    /// Diagnostic detail.
    Debug,
    /// Normal progress.
    Info,
    /// Recoverable anomaly.
    Warn,
    /// Failure requiring attention.
    Error,
}

/// Analysis event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: i64,
    /// Severity.
    pub level: EventLevel,
    /// Analysis stage when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<&'static str>,
    /// Dataset identifier when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<String>,
    /// Channel message identifier when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<u64>,
    /// Outcome label when the event closes a message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<&'static str>,
    /// Human-readable message.
    pub message: String,
    /// Error text or engine output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AnalysisEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(level: EventLevel, event: &'static str, message: impl Into<String>) -> Self {
        Self {
            event,
            timestamp_ms: Timestamp::now().as_unix_millis(),
            level,
            stage: None,
            dataset_id: None,
            message_id: None,
            outcome: None,
            message: message.into(),
            detail: None,
        }
    }

    /// Sets the stage.
    #[must_use]
    pub const fn with_stage(mut self, stage: AnalysisStage) -> Self {
        self.stage = Some(stage.as_str());
        self
    }

    /// Sets the dataset identifier.
    #[must_use]
    pub fn with_dataset(mut self, id: &DatasetId) -> Self {
        self.dataset_id = Some(id.to_string());
        self
    }

    /// Sets the message identifier.
    #[must_use]
    pub const fn with_message_id(mut self, id: MessageId) -> Self {
        self.message_id = Some(id.get());
        self
    }

    /// Sets the outcome label.
    #[must_use]
    pub const fn with_outcome(mut self, outcome: &'static str) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Sets the detail text.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Sink for analysis events.
pub trait AnalysisEventSink: Send + Sync {
    /// Records an event.
    fn record(&self, event: &AnalysisEvent);
}

/// Sink that writes JSON lines to stderr, dropping events below a level.
pub struct StderrEventSink {
    /// Minimum recorded level.
    min_level: EventLevel,
}

impl StderrEventSink {
    /// Creates a stderr sink with a minimum level.
    #[must_use]
    pub const fn new(min_level: EventLevel) -> Self {
        Self {
            min_level,
        }
    }
}

impl Default for StderrEventSink {
    fn default() -> Self {
        Self::new(EventLevel::Info)
    }
}

impl AnalysisEventSink for StderrEventSink {
    fn record(&self, event: &AnalysisEvent) {
        if event.level < self.min_level {
            return;
        }
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
    /// Minimum recorded level.
    min_level: EventLevel,
}

impl FileEventSink {
    /// Opens the event log in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path, min_level: EventLevel) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
            min_level,
        })
    }
}

impl AnalysisEventSink for FileEventSink {
    fn record(&self, event: &AnalysisEvent) {
        if event.level < self.min_level {
            return;
        }
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Sink that keeps events in memory for inspection.
#[derive(Debug, Default)]
pub struct InMemoryEventSink {
    /// Recorded events.
    events: Mutex<Vec<AnalysisEvent>>,
}

impl InMemoryEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<AnalysisEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns true when an event with the identifier was recorded.
    #[must_use]
    pub fn contains(&self, event: &str) -> bool {
        self.events().iter().any(|recorded| recorded.event == event)
    }
}

impl AnalysisEventSink for InMemoryEventSink {
    fn record(&self, event: &AnalysisEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// No-op event sink.
pub struct NoopEventSink;

impl AnalysisEventSink for NoopEventSink {
    fn record(&self, _event: &AnalysisEvent) {}
}
