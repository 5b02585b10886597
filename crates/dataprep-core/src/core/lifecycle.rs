// crates/dataprep-core/src/core/lifecycle.rs
// ============================================================================
// Module: Dataprep Lifecycle
// Description: Monotone set of completed analysis stages for a dataset.
// Purpose: Enforce set-once stage flags and cross-stage preconditions.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! The lifecycle is not a linear automaton: stages are independent flags that
//! different workers set in any order, except where a stage declares a
//! precondition. Flags can only be set; there is no API to clear one, and
//! re-marking a completed stage is a no-op.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Stages
// ============================================================================

/// Analysis stages tracked by the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    /// Column names and types inferred.
    Schema,
    /// Per-column quality breakdown computed.
    Quality,
    /// Content indexed for search.
    Indexing,
}

impl AnalysisStage {
    /// Returns the stage that must be complete before this one may be marked.
    #[must_use]
    pub const fn precondition(self) -> Option<Self> {
        match self {
            Self::Quality => Some(Self::Schema),
            Self::Schema | Self::Indexing => None,
        }
    }

    /// Returns a stable label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Quality => "quality",
            Self::Indexing => "indexing",
        }
    }
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Lifecycle transition errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The stage's precondition has not completed yet.
    #[error("cannot mark {stage} before {required} is complete")]
    PreconditionNotMet {
        /// Stage being marked.
        stage: AnalysisStage,
        /// Stage that must complete first.
        required: AnalysisStage,
    },
}

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

/// Completed analysis stages for a dataset.
///
/// # Invariants
/// - Flags only transition from `false` to `true`.
/// - `quality_analyzed` is only set while `schema_analyzed` is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    /// Schema stage complete.
    #[serde(default)]
    schema_analyzed: bool,
    /// Quality stage complete.
    #[serde(default)]
    quality_analyzed: bool,
    /// Indexing stage complete.
    #[serde(default)]
    content_indexed: bool,
}

impl Lifecycle {
    /// Returns the initial lifecycle with no stage complete.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            schema_analyzed: false,
            quality_analyzed: false,
            content_indexed: false,
        }
    }

    /// Returns true when the schema stage is complete.
    #[must_use]
    pub const fn schema_analyzed(&self) -> bool {
        self.schema_analyzed
    }

    /// Returns true when the quality stage is complete.
    #[must_use]
    pub const fn quality_analyzed(&self) -> bool {
        self.quality_analyzed
    }

    /// Returns true when the indexing stage is complete.
    #[must_use]
    pub const fn content_indexed(&self) -> bool {
        self.content_indexed
    }

    /// Returns true when the given stage is complete.
    #[must_use]
    pub const fn is_complete(&self, stage: AnalysisStage) -> bool {
        match stage {
            AnalysisStage::Schema => self.schema_analyzed,
            AnalysisStage::Quality => self.quality_analyzed,
            AnalysisStage::Indexing => self.content_indexed,
        }
    }

    /// Returns true when the stage's precondition (if any) is complete.
    #[must_use]
    pub const fn precondition_met(&self, stage: AnalysisStage) -> bool {
        match stage.precondition() {
            Some(required) => self.is_complete(required),
            None => true,
        }
    }

    /// Marks a stage complete. Returns `true` when the flag changed and
    /// `false` when the stage was already complete.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::PreconditionNotMet`] when the stage's
    /// precondition is incomplete.
    pub fn mark_complete(&mut self, stage: AnalysisStage) -> Result<bool, LifecycleError> {
        if let Some(required) = stage.precondition()
            && !self.is_complete(required)
        {
            return Err(LifecycleError::PreconditionNotMet {
                stage,
                required,
            });
        }
        let flag = match stage {
            AnalysisStage::Schema => &mut self.schema_analyzed,
            AnalysisStage::Quality => &mut self.quality_analyzed,
            AnalysisStage::Indexing => &mut self.content_indexed,
        };
        let changed = !*flag;
        *flag = true;
        Ok(changed)
    }
}
