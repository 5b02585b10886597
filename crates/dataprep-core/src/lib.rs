// crates/dataprep-core/src/lib.rs
// ============================================================================
// Module: Dataprep Core Library
// Description: Public API surface for the dataset analysis pipeline core.
// Purpose: Expose dataset model types, collaborator interfaces, and workers.
// Dependencies: crate::{actions, core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Dataprep core drives the asynchronous analysis lifecycle of uploaded
//! datasets. Workers consume analysis requests from an at-least-once channel,
//! serialize work per dataset through a distributed lock, and delegate the
//! statistical computation to an external engine. Storage, locking, content
//! access, and messaging are reached only through the traits in
//! [`interfaces`], so backends can be swapped without touching the workers.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod actions;
pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AnalysisEngine;
pub use interfaces::AnalysisMessage;
pub use interfaces::ChannelError;
pub use interfaces::ContentAccessor;
pub use interfaces::ContentError;
pub use interfaces::DeliveryReceipt;
pub use interfaces::EngineError;
pub use interfaces::EngineParameters;
pub use interfaces::EngineRequest;
pub use interfaces::LockError;
pub use interfaces::LockLease;
pub use interfaces::LockManager;
pub use interfaces::MessageChannel;
pub use interfaces::MetadataStore;
pub use interfaces::OutputFormat;
pub use interfaces::ReceivedMessage;
pub use interfaces::StoreError;
pub use runtime::AnalysisOutcome;
pub use runtime::AnalysisWorker;
pub use runtime::DeferReason;
pub use runtime::DropReason;
pub use runtime::EnrichmentPolicy;
pub use runtime::InMemoryContentStore;
pub use runtime::InMemoryLockManager;
pub use runtime::InMemoryMessageChannel;
pub use runtime::InMemoryMetadataStore;
pub use runtime::MessageHandler;
pub use runtime::PoolOptions;
pub use runtime::QualityAnalyzer;
pub use runtime::SchemaAnalyzer;
pub use runtime::WorkerConfig;
pub use runtime::WorkerError;
pub use runtime::WorkerPool;
