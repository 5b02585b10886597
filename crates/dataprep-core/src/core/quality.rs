// crates/dataprep-core/src/core/quality.rs
// ============================================================================
// Module: Dataprep Column Quality
// Description: Per-column valid/invalid/empty percentage breakdown.
// Purpose: Keep the quality record's sum invariant enforced at construction.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A [`Quality`] record is either undefined (all zero, before quality
//! analysis) or a percentage breakdown whose three parts sum to
//! [`QUALITY_TOTAL`]. Both constructors and deserialization reject anything
//! else, so a record read back from a store upholds the invariant too.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Sum of valid, invalid, and empty parts for an analyzed column.
pub const QUALITY_TOTAL: u32 = 100;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Quality construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QualityError {
    /// Parts do not sum to the fixed total.
    #[error("quality parts sum to {actual}, expected {QUALITY_TOTAL}")]
    InvalidSum {
        /// Observed sum.
        actual: u64,
    },
    /// Raw counts were all zero, so no breakdown can be derived.
    #[error("quality counts are all zero")]
    NoSamples,
}

// ============================================================================
// SECTION: Quality Record
// ============================================================================

/// Percentage breakdown of a column's values.
///
/// # Invariants
/// - Either every part is zero (undefined) or `valid + invalid + empty == 100`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawQuality")]
pub struct Quality {
    /// Percentage of values matching the column type.
    valid: u32,
    /// Percentage of values not matching the column type.
    invalid: u32,
    /// Percentage of empty values.
    empty: u32,
}

/// Unchecked wire form used during deserialization.
#[derive(Deserialize)]
struct RawQuality {
    /// Valid percentage.
    valid: u32,
    /// Invalid percentage.
    invalid: u32,
    /// Empty percentage.
    empty: u32,
}

impl TryFrom<RawQuality> for Quality {
    type Error = QualityError;

    fn try_from(raw: RawQuality) -> Result<Self, Self::Error> {
        if raw.valid == 0 && raw.invalid == 0 && raw.empty == 0 {
            return Ok(Self::undefined());
        }
        Self::new(raw.valid, raw.invalid, raw.empty)
    }
}

impl Quality {
    /// Returns the undefined record held by columns before quality analysis.
    #[must_use]
    pub const fn undefined() -> Self {
        Self {
            valid: 0,
            invalid: 0,
            empty: 0,
        }
    }

    /// Creates a record from percentages.
    ///
    /// # Errors
    ///
    /// Returns [`QualityError::InvalidSum`] unless the parts sum to [`QUALITY_TOTAL`].
    pub fn new(valid: u32, invalid: u32, empty: u32) -> Result<Self, QualityError> {
        let actual = u64::from(valid) + u64::from(invalid) + u64::from(empty);
        if actual != u64::from(QUALITY_TOTAL) {
            return Err(QualityError::InvalidSum {
                actual,
            });
        }
        Ok(Self {
            valid,
            invalid,
            empty,
        })
    }

    /// Normalizes raw value counts into percentages using largest remainders,
    /// so the rounded parts always sum to exactly [`QUALITY_TOTAL`].
    ///
    /// # Errors
    ///
    /// Returns [`QualityError::NoSamples`] when every count is zero.
    pub fn from_counts(valid: u64, invalid: u64, empty: u64) -> Result<Self, QualityError> {
        let counts = [u128::from(valid), u128::from(invalid), u128::from(empty)];
        let total: u128 = counts.iter().sum();
        if total == 0 {
            return Err(QualityError::NoSamples);
        }
        let scale = u128::from(QUALITY_TOTAL);
        let mut parts = [0_u128; 3];
        let mut remainders = [(0_u128, 0_usize); 3];
        for (index, count) in counts.iter().enumerate() {
            parts[index] = count * scale / total;
            remainders[index] = (count * scale % total, index);
        }
        let assigned: u128 = parts.iter().sum();
        // Stable sort keeps valid > invalid > empty precedence on ties.
        remainders.sort_by(|left, right| right.0.cmp(&left.0));
        let missing = usize::try_from(scale - assigned).unwrap_or(0);
        for (_, index) in remainders.iter().take(missing) {
            parts[*index] += 1;
        }
        let [valid, invalid, empty] = parts.map(|part| u32::try_from(part).unwrap_or(QUALITY_TOTAL));
        Self::new(valid, invalid, empty)
    }

    /// Returns true once the record carries an analyzed breakdown.
    #[must_use]
    pub const fn is_defined(&self) -> bool {
        self.valid + self.invalid + self.empty == QUALITY_TOTAL
    }

    /// Percentage of valid values.
    #[must_use]
    pub const fn valid(&self) -> u32 {
        self.valid
    }

    /// Percentage of invalid values.
    #[must_use]
    pub const fn invalid(&self) -> u32 {
        self.invalid
    }

    /// Percentage of empty values.
    #[must_use]
    pub const fn empty(&self) -> u32 {
        self.empty
    }
}
