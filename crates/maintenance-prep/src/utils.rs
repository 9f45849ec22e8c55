//! Shared utilities for reading raw field values.
//!
//! Input columns are read as text and parsed according to their declared
//! role, so these helpers decide what counts as missing and how numbers
//! are recognised.

use polars::prelude::*;

// =============================================================================
// Missing Value Markers
// =============================================================================

/// Text markers treated as a missing value (compared case-insensitively).
pub const MISSING_MARKERS: [&str; 8] = ["na", "n/a", "nan", "null", "none", "missing", "?", "#n/a"];

/// Check if a raw field is empty or a missing marker.
///
/// # Example
///
/// ```rust,ignore
/// use maintenance_prep::utils::is_missing_marker;
///
/// assert!(is_missing_marker("  "));
/// assert!(is_missing_marker("N/A"));
/// assert!(!is_missing_marker("0"));
/// ```
pub fn is_missing_marker(s: &str) -> bool {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return true;
    }
    let lower = trimmed.to_ascii_lowercase();
    MISSING_MARKERS.iter().any(|&marker| lower == marker)
}

/// Normalise a raw field: `None` for missing, otherwise the trimmed text.
pub fn present(raw: Option<&str>) -> Option<&str> {
    match raw {
        Some(s) if !is_missing_marker(s) => Some(s.trim()),
        _ => None,
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse a trimmed field as a finite f64.
pub fn parse_f64(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a trimmed field as an integer flag.
///
/// Accepts integral floats such as "1.0" because spreadsheet exports write
/// flags that way.
pub fn parse_flag(s: &str) -> Option<i64> {
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    match parse_f64(s) {
        Some(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Some(v as i64),
        _ => None,
    }
}

// =============================================================================
// Series Utilities
// =============================================================================

/// Raw text values of a column, regardless of its physical dtype.
pub fn raw_values(column: &Column) -> PolarsResult<Vec<Option<String>>> {
    let as_text = column.as_materialized_series().cast(&DataType::String)?;
    Ok(as_text
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Median of the given values, via polars.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Series::new("median".into(), values).median()
}

// =============================================================================
// Tests
// =============================================================================
