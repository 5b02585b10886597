// crates/dataprep-config/src/lib.rs
// ============================================================================
// Module: Dataprep Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for dataprep-analysis.toml semantics.
// Dependencies: dataprep-core, dataprep-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `dataprep-config` defines the configuration model for the analysis worker
//! binary. Files are size-limited, parsed strictly, and validated fail-closed;
//! section helpers convert validated values into the runtime option types the
//! workers and backends consume.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
