// crates/dataprep-core/src/runtime/mod.rs
// ============================================================================
// Module: Dataprep Runtime
// Description: Analysis workers, consumer pool, and in-memory backends.
// Purpose: Execute analysis stages against the collaborator interfaces.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The runtime turns analysis requests into lifecycle transitions. Workers
//! are generic over their collaborators; the in-memory backends here serve
//! tests and single-process deployments.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod channel;
pub mod content;
pub mod events;
pub mod lock;
pub mod metrics;
pub mod pool;
pub mod quality;
pub mod schema;
pub mod scoring;
pub mod store;
pub mod worker;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use channel::Delivery;
pub use channel::InMemoryMessageChannel;
pub use content::InMemoryContentStore;
pub use content::MaterializeOptions;
pub use content::MaterializedContent;
pub use content::materialize;
pub use events::AnalysisEvent;
pub use events::AnalysisEventSink;
pub use events::EventLevel;
pub use events::FileEventSink;
pub use events::InMemoryEventSink;
pub use events::NoopEventSink;
pub use events::StderrEventSink;
pub use lock::InMemoryLockManager;
pub use lock::LockGuard;
pub use lock::lock_scoped;
pub use metrics::NoopMetrics;
pub use metrics::WorkerMetrics;
pub use pool::MessageHandler;
pub use pool::PollRound;
pub use pool::PoolOptions;
pub use pool::WorkerPool;
pub use quality::EnrichmentError;
pub use quality::EnrichmentPolicy;
pub use quality::QualityAnalyzer;
pub use schema::SchemaAnalyzer;
pub use scoring::AnalysisReport;
pub use scoring::EngineQualityScorer;
pub use scoring::QualityScorer;
pub use scoring::RandomQualityScorer;
pub use scoring::ScorerKind;
pub use store::InMemoryMetadataStore;
pub use worker::AnalysisOutcome;
pub use worker::AnalysisWorker;
pub use worker::AnalyzeError;
pub use worker::DatasetAnalyzer;
pub use worker::DeferReason;
pub use worker::DropReason;
pub use worker::StageReport;
pub use worker::UNEXPECTED_CHANNEL_EXCEPTION;
pub use worker::WorkerConfig;
pub use worker::WorkerError;
