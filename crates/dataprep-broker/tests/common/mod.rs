// crates/dataprep-broker/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Shared fixtures for broker tests.
// Purpose: Provide metadata records, snapshots, and engine requests.
// Dependencies: dataprep-core, tempfile
// ============================================================================

//! ## Overview
//! Provides shared helper functions for content store and engine tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::io::Read;
use std::io::Write;

use dataprep_core::DatasetId;
use dataprep_core::DatasetMetadata;
use dataprep_core::Timestamp;
use tempfile::NamedTempFile;

/// Sample delimited content.
pub const SAMPLE_CSV: &str = "id;name\n1;alice\n2;bob\n";

/// Metadata for the given dataset id.
pub fn metadata(id: &str) -> DatasetMetadata {
    DatasetMetadata::new(DatasetId::new(id), "customers", Timestamp::from_unix_millis(0))
}

/// Writes a snapshot file holding `content`.
pub fn snapshot(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("snapshot file");
    file.write_all(content.as_bytes()).expect("write snapshot");
    file.flush().expect("flush snapshot");
    file
}

/// Reads a boxed content stream to a string.
pub fn read_all(mut reader: Box<dyn Read + Send>) -> String {
    let mut text = String::new();
    reader.read_to_string(&mut text).expect("read content");
    text
}
