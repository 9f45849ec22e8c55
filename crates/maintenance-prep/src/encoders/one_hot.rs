//! One-hot encoding with a fixed, sorted category order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A fitted one-hot encoder for a single categorical column.
///
/// Categories are the distinct non-missing values seen at fit time, in
/// lexicographic order. That order fixes the output columns for every
/// later transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub column: String,
    pub categories: Vec<String>,
}

/// Indicator columns produced for one categorical column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedColumn {
    /// One vector per category, each with one entry per row.
    pub indicators: Vec<Vec<i64>>,
    /// Rows whose value was missing or not seen at fit time.
    pub unencoded: usize,
}

impl OneHotEncoder {
    /// Learn the categories of a column. Missing values are skipped.
    pub fn fit<S: AsRef<str>>(column: impl Into<String>, values: &[Option<S>]) -> Self {
        let categories: BTreeSet<String> = values
            .iter()
            .flatten()
            .map(|v| v.as_ref().to_string())
            .collect();

        Self {
            column: column.into(),
            categories: categories.into_iter().collect(),
        }
    }

    /// Output column names, `<column>_<category>`.
    pub fn feature_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| format!("{}_{}", self.column, c))
            .collect()
    }

    /// Position of a category, or `None` when it was not seen at fit time.
    pub fn category_index(&self, value: &str) -> Option<usize> {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
    }

    /// Encode a single value. Missing or unseen values encode as all zeros.
    pub fn encode(&self, value: Option<&str>) -> Vec<i64> {
        let mut row = vec![0; self.categories.len()];
        if let Some(idx) = value.and_then(|v| self.category_index(v)) {
            row[idx] = 1;
        }
        row
    }

    /// Encode a whole column into per-category indicator vectors.
    pub fn encode_column<S: AsRef<str>>(&self, values: &[Option<S>]) -> EncodedColumn {
        let mut indicators = vec![vec![0i64; values.len()]; self.categories.len()];
        let mut unencoded = 0;

        for (row, value) in values.iter().enumerate() {
            match value.as_ref().and_then(|v| self.category_index(v.as_ref())) {
                Some(idx) => indicators[idx][row] = 1,
                None => unencoded += 1,
            }
        }

        EncodedColumn {
            indicators,
            unencoded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitted_abc() -> OneHotEncoder {
        OneHotEncoder::fit("Type", &[Some("C"), Some("A"), None, Some("B"), Some("A")])
    }

    #[test]
    fn test_fit_sorts_and_dedups() {
        let encoder = fitted_abc();
        assert_eq!(encoder.categories, vec!["A", "B", "C"]);
        assert_eq!(encoder.feature_names(), vec!["Type_A", "Type_B", "Type_C"]);
    }

    #[test]
    fn test_encode_stable_order() {
        let encoder = fitted_abc();
        assert_eq!(encoder.encode(Some("A")), vec![1, 0, 0]);
        assert_eq!(encoder.encode(Some("B")), vec![0, 1, 0]);
        assert_eq!(encoder.encode(Some("C")), vec![0, 0, 1]);
    }

    #[test]
    fn test_unseen_and_missing_encode_as_zeros() {
        let encoder = fitted_abc();
        assert_eq!(encoder.encode(Some("Z")), vec![0, 0, 0]);
        assert_eq!(encoder.encode(None), vec![0, 0, 0]);
    }

    #[test]
    fn test_encode_column() {
        let encoder = fitted_abc();
        let encoded = encoder.encode_column(&[Some("B"), Some("Q"), None, Some("A")]);

        assert_eq!(encoded.indicators[0], vec![0, 0, 0, 1]);
        assert_eq!(encoded.indicators[1], vec![1, 0, 0, 0]);
        assert_eq!(encoded.indicators[2], vec![0, 0, 0, 0]);
        assert_eq!(encoded.unencoded, 2);
    }
}
