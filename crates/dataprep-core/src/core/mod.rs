// crates/dataprep-core/src/core/mod.rs
// ============================================================================
// Module: Dataprep Core Types
// Description: Canonical dataset metadata, lifecycle, and message structures.
// Purpose: Provide stable, serializable types shared by every pipeline stage.
// Dependencies: serde, serde_json, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Core types describe datasets (columns, quality records, lifecycle flags) and
//! the analysis requests that travel on the message channel. They are the
//! canonical form persisted by metadata stores.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod hashing;
pub mod identifiers;
pub mod lifecycle;
pub mod messages;
pub mod metadata;
pub mod quality;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use identifiers::ColumnId;
pub use identifiers::DatasetId;
pub use identifiers::MessageId;
pub use lifecycle::AnalysisStage;
pub use lifecycle::Lifecycle;
pub use lifecycle::LifecycleError;
pub use messages::AnalysisRequest;
pub use messages::DATASET_ID_PROPERTY;
pub use messages::Destination;
pub use metadata::ColumnMetadata;
pub use metadata::ColumnType;
pub use metadata::DatasetMetadata;
pub use quality::QUALITY_TOTAL;
pub use quality::Quality;
pub use quality::QualityError;
pub use time::Timestamp;
