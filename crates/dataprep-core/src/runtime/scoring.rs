// crates/dataprep-core/src/runtime/scoring.rs
// ============================================================================
// Module: Dataprep Quality Scoring
// Description: Column quality scorers and the parsed engine report.
// Purpose: Turn column statistics into normalized quality percentages.
// Dependencies: rand, serde, serde_json, thiserror, crate::core
// ============================================================================

//! ## Overview
//! A [`QualityScorer`] produces one [`Quality`] per column. The random scorer
//! draws placeholder percentages in fixed bands and ignores the engine. The
//! engine scorer derives percentages from per-column counts in the engine's
//! JSON report.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::ColumnMetadata;
use crate::core::Quality;
use crate::core::QualityError;

// ============================================================================
// SECTION: Engine Report
// ============================================================================

/// Per-column counts reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnStatistics {
    /// Column name or identifier.
    pub name: String,
    /// Count of values conforming to the column type.
    #[serde(default)]
    pub valid: u64,
    /// Count of values violating the column type.
    #[serde(default)]
    pub invalid: u64,
    /// Count of empty values.
    #[serde(default)]
    pub empty: u64,
}

/// JSON document layout produced by the engine.
#[derive(Debug, Deserialize)]
struct ReportDocument {
    /// Column statistics.
    #[serde(default)]
    columns: Vec<ColumnStatistics>,
}

/// Engine output with any per-column statistics it carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisReport {
    /// Raw engine output.
    raw: String,
    /// Parsed column statistics; empty when the output had none.
    columns: Vec<ColumnStatistics>,
}

impl AnalysisReport {
    /// Parses engine output. Output without column statistics yields a report
    /// with no columns rather than an error.
    #[must_use]
    pub fn parse(raw: String) -> Self {
        let columns = serde_json::from_str::<ReportDocument>(&raw)
            .map(|document| document.columns)
            .unwrap_or_default();
        Self {
            raw,
            columns,
        }
    }

    /// Returns the raw engine output.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns the parsed column statistics.
    #[must_use]
    pub fn columns(&self) -> &[ColumnStatistics] {
        &self.columns
    }

    /// Finds statistics for a column by identifier or name.
    #[must_use]
    pub fn column(&self, column: &ColumnMetadata) -> Option<&ColumnStatistics> {
        self.columns
            .iter()
            .find(|stats| stats.name == column.id.as_str() || stats.name == column.name)
    }
}

// ============================================================================
// SECTION: Scorers
// ============================================================================

/// Scoring errors.
#[derive(Debug, Error)]
pub enum ScoreError {
    /// Scorer needs an engine report and none is available.
    #[error("engine report required for scoring")]
    MissingReport,
    /// Engine report has no statistics for the column.
    #[error("engine report has no statistics for column {0}")]
    MissingColumn(String),
    /// Statistics do not form a valid quality record.
    #[error(transparent)]
    Quality(#[from] QualityError),
    /// Scorer state is unusable.
    #[error("scorer unavailable: {0}")]
    Unavailable(String),
}

/// Scorer selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    /// Placeholder percentages drawn from fixed bands.
    #[default]
    Random,
    /// Percentages derived from engine column counts.
    Engine,
}

/// Computes a quality record for one column.
pub trait QualityScorer: Send + Sync {
    /// Scores a column, optionally using the engine report.
    ///
    /// # Errors
    ///
    /// Returns [`ScoreError`] when the column cannot be scored.
    fn score(&self, column: &ColumnMetadata, report: Option<&AnalysisReport>) -> Result<Quality, ScoreError>;
}

/// Inclusive-exclusive band for the valid percentage.
const VALID_BAND: std::ops::Range<u32> = 50 .. 70;
/// Inclusive-exclusive band for the invalid percentage.
const INVALID_BAND: std::ops::Range<u32> = 25 .. 30;

/// Placeholder scorer: valid in `[50, 70)`, invalid in `[25, 30)`, empty is
/// the remainder.
#[derive(Debug)]
pub struct RandomQualityScorer {
    /// Random source.
    rng: Mutex<StdRng>,
}

impl RandomQualityScorer {
    /// Creates a scorer seeded from system entropy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Creates a deterministic scorer.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomQualityScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl QualityScorer for RandomQualityScorer {
    fn score(&self, _column: &ColumnMetadata, _report: Option<&AnalysisReport>) -> Result<Quality, ScoreError> {
        let mut rng = self.rng.lock().map_err(|_| ScoreError::Unavailable("rng mutex poisoned".to_string()))?;
        let valid = rng.gen_range(VALID_BAND);
        let invalid = rng.gen_range(INVALID_BAND);
        drop(rng);
        Ok(Quality::new(valid, invalid, crate::core::QUALITY_TOTAL - valid - invalid)?)
    }
}

/// Scorer deriving percentages from engine column counts.
#[derive(Debug, Default, Clone, Copy)]
pub struct EngineQualityScorer;

impl QualityScorer for EngineQualityScorer {
    fn score(&self, column: &ColumnMetadata, report: Option<&AnalysisReport>) -> Result<Quality, ScoreError> {
        let report = report.ok_or(ScoreError::MissingReport)?;
        let stats = report.column(column).ok_or_else(|| ScoreError::MissingColumn(column.name.clone()))?;
        Ok(Quality::from_counts(stats.valid, stats.invalid, stats.empty)?)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

    use super::*;
    use crate::core::ColumnId;
    use crate::core::ColumnType;

    fn column(name: &str) -> ColumnMetadata {
        ColumnMetadata::new(ColumnId::from_index(0), name, ColumnType::Integer)
    }

    #[test]
    fn random_scores_stay_in_bands() {
        let scorer = RandomQualityScorer::seeded(7);
        for _ in 0 .. 200 {
            let quality = scorer.score(&column("age"), None).unwrap();
            assert!((50 .. 70).contains(&quality.valid()));
            assert!((25 .. 30).contains(&quality.invalid()));
            assert_eq!(quality.valid() + quality.invalid() + quality.empty(), 100);
        }
    }

    #[test]
    fn engine_scores_from_counts() {
        let report = AnalysisReport::parse(
            r#"{"columns":[{"name":"age","valid":6,"invalid":3,"empty":1}]}"#.to_string(),
        );
        let quality = EngineQualityScorer.score(&column("age"), Some(&report)).unwrap();
        assert_eq!((quality.valid(), quality.invalid(), quality.empty()), (60, 30, 10));
    }

    #[test]
    fn engine_scorer_requires_report_and_column() {
        assert!(matches!(EngineQualityScorer.score(&column("age"), None), Err(ScoreError::MissingReport)));
        let report = AnalysisReport::parse("not json".to_string());
        assert!(report.columns().is_empty());
        assert!(matches!(
            EngineQualityScorer.score(&column("age"), Some(&report)),
            Err(ScoreError::MissingColumn(_))
        ));
    }
}
