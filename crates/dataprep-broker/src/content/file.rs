// crates/dataprep-broker/src/content/file.rs
// ============================================================================
// Module: Dataprep File Content Store
// Description: Directory-backed content accessor.
// Purpose: Read dataset content from `<root>/<dataset id>`.
// Dependencies: dataprep-core
// ============================================================================

//! ## Overview
//! `FileContentStore` maps each dataset to one file under a root directory.
//! Resolution fails closed on identifiers that are not a single path segment
//! and on symlinks that escape the root.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::ErrorKind;
use std::io::Read;
use std::path::PathBuf;

use dataprep_core::ContentAccessor;
use dataprep_core::ContentError;
use dataprep_core::DatasetMetadata;

use crate::BrokerError;
use crate::content::checked_segment;

// ============================================================================
// SECTION: File Content Store
// ============================================================================

/// File-backed content store.
#[derive(Debug, Clone)]
pub struct FileContentStore {
    /// Canonical root directory.
    root: PathBuf,
}

impl FileContentStore {
    /// Creates a store rooted at an existing directory.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::InvalidPath`] when the root is not a directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, BrokerError> {
        let root = root.into();
        let root = std::fs::canonicalize(&root)
            .map_err(|err| BrokerError::InvalidPath(format!("{}: {err}", root.display())))?;
        if !root.is_dir() {
            return Err(BrokerError::InvalidPath(format!("{} is not a directory", root.display())));
        }
        Ok(Self {
            root,
        })
    }

    /// Returns the canonical root directory.
    #[must_use]
    pub const fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Resolves the content path for a dataset.
    fn resolve_path(&self, metadata: &DatasetMetadata) -> Result<PathBuf, ContentError> {
        let segment = checked_segment(metadata.id())?;
        let resolved = std::fs::canonicalize(self.root.join(segment)).map_err(io_error)?;
        if !resolved.starts_with(&self.root) {
            return Err(ContentError::InvalidLocation("content path escapes configured root".to_string()));
        }
        Ok(resolved)
    }
}

impl ContentAccessor for FileContentStore {
    fn get(&self, metadata: &DatasetMetadata) -> Result<Box<dyn Read + Send>, ContentError> {
        let path = self.resolve_path(metadata)?;
        let file = std::fs::File::open(path).map_err(io_error)?;
        Ok(Box::new(file))
    }
}

/// Maps file system errors, keeping not-found distinct.
fn io_error(err: std::io::Error) -> ContentError {
    if err.kind() == ErrorKind::NotFound {
        ContentError::NotFound(err.to_string())
    } else {
        ContentError::Io(err.to_string())
    }
}
