// crates/dataprep-core/src/actions.rs
// ============================================================================
// Module: Dataprep Value Actions
// Description: Pure cell-level transformations.
// Purpose: Provide the absolute-value action used to sanity-check columns.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Actions map one raw cell value to a new value, or to `None` when the value
//! does not parse for the requested numeric kind. They never fail and never
//! allocate for rejected input.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::ColumnType;

// ============================================================================
// SECTION: Absolute Value
// ============================================================================

/// Absolute value of an integer cell.
#[must_use]
pub fn absolute_integer(value: &str) -> Option<String> {
    value.trim().parse::<i64>().ok().map(|parsed| parsed.unsigned_abs().to_string())
}

/// Absolute value of a decimal cell. Whole results print without a fraction.
#[must_use]
pub fn absolute_decimal(value: &str) -> Option<String> {
    let parsed = value.trim().parse::<f64>().ok().filter(|parsed| parsed.is_finite())?;
    let absolute = parsed.abs();
    if absolute.fract() == 0.0 { Some(format!("{absolute:.0}")) } else { Some(absolute.to_string()) }
}

/// Absolute value of a cell interpreted by its column type. Non-numeric
/// column types yield `None`.
#[must_use]
pub fn absolute(column_type: ColumnType, value: &str) -> Option<String> {
    match column_type {
        ColumnType::Integer => absolute_integer(value),
        ColumnType::Double => absolute_decimal(value),
        ColumnType::String | ColumnType::Boolean => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_values() {
        assert_eq!(absolute_integer("-42").as_deref(), Some("42"));
        assert_eq!(absolute_integer("7").as_deref(), Some("7"));
        assert_eq!(absolute_integer("-9223372036854775808").as_deref(), Some("9223372036854775808"));
        assert_eq!(absolute_integer("1.5"), None);
        assert_eq!(absolute_integer("abc"), None);
    }

    #[test]
    fn decimal_values() {
        assert_eq!(absolute_decimal("-5.0").as_deref(), Some("5"));
        assert_eq!(absolute_decimal("-1.25").as_deref(), Some("1.25"));
        assert_eq!(absolute_decimal("3").as_deref(), Some("3"));
        assert_eq!(absolute_decimal("NaN"), None);
        assert_eq!(absolute_decimal("inf"), None);
        assert_eq!(absolute_decimal(""), None);
    }

    #[test]
    fn dispatch_by_column_type() {
        assert_eq!(absolute(ColumnType::Integer, "-3").as_deref(), Some("3"));
        assert_eq!(absolute(ColumnType::Double, "-0.5").as_deref(), Some("0.5"));
        assert_eq!(absolute(ColumnType::String, "-3"), None);
        assert_eq!(absolute(ColumnType::Boolean, "true"), None);
    }
}
