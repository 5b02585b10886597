// crates/dataprep-core/src/runtime/store.rs
// ============================================================================
// Module: Dataprep In-Memory Metadata Store
// Description: Process-local metadata store for tests and single-node runs.
// Purpose: Provide a MetadataStore without external dependencies.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryMetadataStore`] keeps metadata in a mutex-protected map shared by
//! every clone. It is not durable; use the SQLite store for deployments where
//! several processes share state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::DatasetId;
use crate::core::DatasetMetadata;
use crate::interfaces::MetadataStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory metadata store; clones share the same records.
#[derive(Debug, Default, Clone)]
pub struct InMemoryMetadataStore {
    /// Metadata map protected by a mutex.
    records: Arc<Mutex<BTreeMap<DatasetId, DatasetMetadata>>>,
}

impl InMemoryMetadataStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the record map.
    fn records(&self) -> Result<MutexGuard<'_, BTreeMap<DatasetId, DatasetMetadata>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Store("metadata store mutex poisoned".to_string()))
    }
}

impl MetadataStore for InMemoryMetadataStore {
    fn get(&self, id: &DatasetId) -> Result<Option<DatasetMetadata>, StoreError> {
        Ok(self.records()?.get(id).cloned())
    }

    fn add(&self, metadata: &DatasetMetadata) -> Result<(), StoreError> {
        self.records()?.insert(metadata.id().clone(), metadata.clone());
        Ok(())
    }

    fn update(&self, metadata: &DatasetMetadata) -> Result<(), StoreError> {
        let mut guard = self.records()?;
        let Some(slot) = guard.get_mut(metadata.id()) else {
            return Err(StoreError::NotFound(metadata.id().to_string()));
        };
        *slot = metadata.clone();
        drop(guard);
        Ok(())
    }

    fn remove(&self, id: &DatasetId) -> Result<bool, StoreError> {
        Ok(self.records()?.remove(id).is_some())
    }

    fn list(&self) -> Result<Vec<DatasetId>, StoreError> {
        Ok(self.records()?.keys().cloned().collect())
    }
}
