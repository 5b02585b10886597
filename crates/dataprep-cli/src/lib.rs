// crates/dataprep-cli/src/lib.rs
// ============================================================================
// Module: Dataprep CLI Library
// Description: Runtime assembly shared by the CLI binary and its tests.
// Purpose: Turn a validated configuration into running analysis workers.
// Dependencies: dataprep-broker, dataprep-config, dataprep-core,
//               dataprep-store-sqlite
// ============================================================================

//! ## Overview
//! The `dataprep-analysis` binary is a thin dispatcher; the wiring from
//! configuration sections to store, channel, content, engine, and worker
//! instances lives here so it can be exercised without spawning processes.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod wiring;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use wiring::AnalysisRuntime;
pub use wiring::StageSelection;
pub use wiring::WiringError;
