// crates/dataprep-broker/src/content/mod.rs
// ============================================================================
// Module: Dataprep Content Stores
// Description: File and HTTP implementations of the content accessor.
// Purpose: Open raw dataset content as a byte stream.
// Dependencies: dataprep-core
// ============================================================================

//! ## Overview
//! Content stores address a dataset's raw bytes by its identifier. They
//! return a stream and leave size enforcement to materialization, except
//! where a remote declares an oversized body up front.

// ============================================================================
// SECTION: Imports
// ============================================================================

use dataprep_core::ContentError;
use dataprep_core::DatasetId;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects dataset identifiers that cannot name a single path segment.
pub(crate) fn checked_segment(id: &DatasetId) -> Result<&str, ContentError> {
    let segment = id.as_str();
    let invalid = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0']);
    if invalid {
        return Err(ContentError::InvalidLocation(format!("dataset id is not a path segment: {segment}")));
    }
    Ok(segment)
}

// ============================================================================
// SECTION: Implementations
// ============================================================================

pub mod file;
pub mod http;

pub use file::FileContentStore;
pub use http::HttpContentStore;
