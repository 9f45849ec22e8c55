//! Imputation module for handling missing values.
//!
//! Two rules exist, chosen by column role:
//! - Constant imputation for failure-indicator columns
//! - Median imputation for numeric measurement columns
//!
//! Both are fitted once and stored in the transformer state as a
//! [`ColumnImputation`], so reapplying them never looks at new data.

mod constant;
mod statistical;

pub use constant::ConstantImputer;
pub use statistical::StatisticalImputer;

use serde::{Deserialize, Serialize};

/// How a column's fill value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputationStrategy {
    /// Domain constant, never estimated from data
    Constant,
    /// Median of the non-missing values seen at fit time
    Median,
}

/// A fitted imputation rule for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnImputation {
    pub column: String,
    pub strategy: ImputationStrategy,
    pub fill_value: f64,
}

impl ColumnImputation {
    /// Replace every missing value with the fill value.
    ///
    /// Returns the number of values replaced. Rows are never dropped.
    pub fn apply(&self, values: &mut [Option<f64>]) -> usize {
        fill_missing(values, self.fill_value)
    }

    /// Integer variant of [`apply`](Self::apply) for flag columns.
    ///
    /// Present values are never converted through `f64`.
    pub fn apply_flags(&self, values: &mut [Option<i64>]) -> usize {
        fill_missing(values, self.fill_value as i64)
    }
}

fn fill_missing<T: Copy>(values: &mut [Option<T>], fill: T) -> usize {
    let mut filled = 0;
    for value in values.iter_mut().filter(|v| v.is_none()) {
        *value = Some(fill);
        filled += 1;
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_counts_and_preserves_present_values() {
        let rule = ColumnImputation {
            column: "TWF".to_string(),
            strategy: ImputationStrategy::Constant,
            fill_value: 0.0,
        };
        let mut values = vec![Some(1.0), None, Some(0.0), None];

        let filled = rule.apply(&mut values);

        assert_eq!(filled, 2);
        assert_eq!(values, vec![Some(1.0), Some(0.0), Some(0.0), Some(0.0)]);
    }

    #[test]
    fn test_apply_flags_keeps_large_integers() {
        let rule = ColumnImputation {
            column: "RNF".to_string(),
            strategy: ImputationStrategy::Constant,
            fill_value: 0.0,
        };
        let big = i64::MAX - 1;
        let mut values = vec![Some(big), None];

        assert_eq!(rule.apply_flags(&mut values), 1);
        assert_eq!(values, vec![Some(big), Some(0)]);
    }
}
