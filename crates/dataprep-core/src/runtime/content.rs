// crates/dataprep-core/src/runtime/content.rs
// ============================================================================
// Module: Dataprep Content Runtime
// Description: In-memory content accessor and temporary-file materialization.
// Purpose: Snapshot dataset content to a bounded local file for the engine.
// Dependencies: tempfile, crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The analysis engine reads from a filesystem path, so workers copy the
//! dataset's content stream into a temporary file first. Materialization is
//! bounded by a byte limit and the file is removed when the
//! [`MaterializedContent`] handle drops, on success and failure alike.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::io::Cursor;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use crate::core::DatasetId;
use crate::core::DatasetMetadata;
use crate::interfaces::ContentAccessor;
use crate::interfaces::ContentError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default maximum bytes copied into a materialized snapshot.
pub const DEFAULT_MAX_MATERIALIZE_BYTES: u64 = 256 * 1024 * 1024;

/// File name prefix for materialized snapshots.
const SNAPSHOT_PREFIX: &str = "dataset";

// ============================================================================
// SECTION: In-Memory Content
// ============================================================================

/// In-memory content accessor; clones share the same content map.
#[derive(Debug, Default, Clone)]
pub struct InMemoryContentStore {
    /// Raw content keyed by dataset identifier.
    content: Arc<Mutex<BTreeMap<DatasetId, Arc<[u8]>>>>,
}

impl InMemoryContentStore {
    /// Creates an empty content store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores raw content for a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::Io`] when the content map is poisoned.
    pub fn put(&self, id: &DatasetId, bytes: impl Into<Vec<u8>>) -> Result<(), ContentError> {
        let mut guard =
            self.content.lock().map_err(|_| ContentError::Io("content store mutex poisoned".to_string()))?;
        guard.insert(id.clone(), Arc::from(bytes.into()));
        drop(guard);
        Ok(())
    }
}

impl ContentAccessor for InMemoryContentStore {
    fn get(&self, metadata: &DatasetMetadata) -> Result<Box<dyn Read + Send>, ContentError> {
        let guard =
            self.content.lock().map_err(|_| ContentError::Io("content store mutex poisoned".to_string()))?;
        let bytes = guard
            .get(metadata.id())
            .cloned()
            .ok_or_else(|| ContentError::NotFound(metadata.id().to_string()))?;
        drop(guard);
        Ok(Box::new(Cursor::new(bytes)))
    }
}

// ============================================================================
// SECTION: Materialization
// ============================================================================

/// Materialization limits and placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializeOptions {
    /// Maximum bytes copied before failing.
    pub max_bytes: u64,
    /// Directory for snapshots; the system temp directory when `None`.
    pub directory: Option<PathBuf>,
}

impl Default for MaterializeOptions {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_MATERIALIZE_BYTES,
            directory: None,
        }
    }
}

/// A dataset snapshot on local disk, removed on drop.
#[derive(Debug)]
pub struct MaterializedContent {
    /// Backing temporary file.
    file: NamedTempFile,
    /// Bytes written.
    len: u64,
}

impl MaterializedContent {
    /// Returns the snapshot path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Returns the snapshot size in bytes.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    /// Returns true when the snapshot is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Copies a dataset's content into a bounded temporary file.
///
/// # Errors
///
/// Returns [`ContentError`] when the content cannot be opened or copied, or
/// [`ContentError::TooLarge`] when it exceeds `options.max_bytes`.
pub fn materialize(
    accessor: &dyn ContentAccessor,
    metadata: &DatasetMetadata,
    options: &MaterializeOptions,
) -> Result<MaterializedContent, ContentError> {
    let reader = accessor.get(metadata)?;
    let suffix = snapshot_suffix(metadata.id());
    let mut builder = tempfile::Builder::new();
    builder.prefix(SNAPSHOT_PREFIX).suffix(&suffix);
    let mut file = match &options.directory {
        Some(directory) => builder.tempfile_in(directory),
        None => builder.tempfile(),
    }
    .map_err(|err| ContentError::Io(err.to_string()))?;

    let mut limited = reader.take(options.max_bytes.saturating_add(1));
    let len = std::io::copy(&mut limited, file.as_file_mut()).map_err(|err| ContentError::Io(err.to_string()))?;
    if len > options.max_bytes {
        return Err(ContentError::TooLarge {
            max_bytes: options.max_bytes,
            read_at_least: len,
        });
    }
    file.as_file_mut().flush().map_err(|err| ContentError::Io(err.to_string()))?;
    Ok(MaterializedContent {
        file,
        len,
    })
}

/// Builds a filesystem-safe file name suffix from a dataset identifier.
fn snapshot_suffix(id: &DatasetId) -> String {
    id.as_str()
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

    use super::*;
    use crate::core::Timestamp;

    fn metadata(id: &str) -> DatasetMetadata {
        DatasetMetadata::new(DatasetId::new(id), "sample", Timestamp::from_unix_millis(0))
    }

    #[test]
    fn snapshot_is_removed_on_drop() {
        let store = InMemoryContentStore::new();
        store.put(&DatasetId::new("ds-1"), b"a;b\n1;2\n".to_vec()).unwrap();
        let snapshot = materialize(&store, &metadata("ds-1"), &MaterializeOptions::default()).unwrap();
        let path = snapshot.path().to_path_buf();
        assert_eq!(std::fs::read(&path).unwrap(), b"a;b\n1;2\n");
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("dataset"));
        assert!(path.to_string_lossy().ends_with("ds-1"));
        drop(snapshot);
        assert!(!path.exists());
    }

    #[test]
    fn oversized_content_is_rejected() {
        let store = InMemoryContentStore::new();
        store.put(&DatasetId::new("ds-1"), vec![b'x'; 64]).unwrap();
        let options = MaterializeOptions {
            max_bytes: 16,
            directory: None,
        };
        let err = materialize(&store, &metadata("ds-1"), &options).unwrap_err();
        assert!(matches!(err, ContentError::TooLarge {
            max_bytes: 16,
            read_at_least: 17
        }));
        assert!(err.to_string().contains("read at least 17 bytes"));
    }

    #[test]
    fn suffix_replaces_path_separators() {
        assert_eq!(snapshot_suffix(&DatasetId::new("../x/y")), "___x_y");
    }
}
