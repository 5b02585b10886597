// crates/dataprep-core/src/core/metadata.rs
// ============================================================================
// Module: Dataprep Dataset Metadata
// Description: Dataset metadata record with columns, lifecycle, and timestamps.
// Purpose: Canonical record owned by metadata stores and mutated by workers.
// Dependencies: serde, crate::core
// ============================================================================

//! ## Overview
//! [`DatasetMetadata`] is created when a dataset is registered and mutated by
//! each analysis stage while that stage holds the dataset's lock. The
//! identifier never changes after construction. Once the schema stage has
//! produced the column list, later stages only mutate columns in place through
//! [`DatasetMetadata::columns_mut`], which hands out a fixed-length slice.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ColumnId;
use crate::core::identifiers::DatasetId;
use crate::core::lifecycle::Lifecycle;
use crate::core::quality::Quality;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Field delimiter assumed when a dataset does not declare one.
pub const DEFAULT_DELIMITER: char = ';';

// ============================================================================
// SECTION: Column Metadata
// ============================================================================

/// Inferred column value type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Free text (also the fallback when nothing narrower fits).
    #[default]
    String,
    /// Whole numbers.
    Integer,
    /// Decimal numbers.
    Double,
    /// `true` / `false` values.
    Boolean,
}

impl ColumnType {
    /// Returns true when a raw cell value conforms to this type.
    #[must_use]
    pub fn accepts(self, value: &str) -> bool {
        let value = value.trim();
        match self {
            Self::String => true,
            Self::Integer => value.parse::<i64>().is_ok(),
            Self::Double => value.parse::<f64>().is_ok_and(f64::is_finite),
            Self::Boolean => value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false"),
        }
    }
}

/// Metadata for a single dataset column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    /// Column identifier.
    pub id: ColumnId,
    /// Column display name.
    pub name: String,
    /// Inferred value type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Quality breakdown (undefined until quality analysis runs).
    #[serde(default)]
    pub quality: Quality,
}

impl ColumnMetadata {
    /// Creates a column with an undefined quality record.
    #[must_use]
    pub fn new(id: ColumnId, name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            id,
            name: name.into(),
            column_type,
            quality: Quality::undefined(),
        }
    }
}

// ============================================================================
// SECTION: Dataset Metadata
// ============================================================================

/// Dataset metadata record.
///
/// # Invariants
/// - `id` is immutable after construction.
/// - Column count only changes through [`DatasetMetadata::replace_columns`],
///   which is reserved for the schema stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    /// Dataset identifier.
    id: DatasetId,
    /// Display name.
    pub name: String,
    /// Field delimiter used by the raw content.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Ordered column descriptors.
    #[serde(default)]
    columns: Vec<ColumnMetadata>,
    /// Completed analysis stages.
    #[serde(default)]
    lifecycle: Lifecycle,
    /// Registration time.
    pub created_at: Timestamp,
    /// Last mutation time.
    pub last_modified: Timestamp,
}

/// Serde default for [`DatasetMetadata::delimiter`].
const fn default_delimiter() -> char {
    DEFAULT_DELIMITER
}

impl DatasetMetadata {
    /// Creates metadata for a freshly registered dataset.
    #[must_use]
    pub fn new(id: DatasetId, name: impl Into<String>, created_at: Timestamp) -> Self {
        Self {
            id,
            name: name.into(),
            delimiter: DEFAULT_DELIMITER,
            columns: Vec::new(),
            lifecycle: Lifecycle::new(),
            created_at,
            last_modified: created_at,
        }
    }

    /// Sets the initial column list while building a record.
    #[must_use]
    pub fn with_columns(mut self, columns: Vec<ColumnMetadata>) -> Self {
        self.columns = columns;
        self
    }

    /// Sets the lifecycle while building a record.
    #[must_use]
    pub fn with_lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// Returns the dataset identifier.
    #[must_use]
    pub const fn id(&self) -> &DatasetId {
        &self.id
    }

    /// Returns the ordered columns.
    #[must_use]
    pub fn columns(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    /// Returns the columns for in-place mutation; the length is fixed.
    pub fn columns_mut(&mut self) -> &mut [ColumnMetadata] {
        &mut self.columns
    }

    /// Replaces the column list with a freshly inferred schema.
    pub fn replace_columns(&mut self, columns: Vec<ColumnMetadata>) {
        self.columns = columns;
    }

    /// Returns the lifecycle.
    #[must_use]
    pub const fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Returns the lifecycle for stage transitions.
    pub const fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    /// Records a mutation time.
    pub const fn touch(&mut self, at: Timestamp) {
        self.last_modified = at;
    }
}
