//! Statistical imputation for numeric measurement columns.

use super::{ColumnImputation, ImputationStrategy};
use crate::utils::median;
use tracing::{debug, warn};

/// Learns statistical fill values from observed data.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Learn the median of the non-missing values of a column.
    ///
    /// A column with no values at all falls back to 0.0 so that fitting an
    /// empty or fully missing column still yields a usable rule.
    pub fn fit_median(column: &str, values: &[Option<f64>]) -> ColumnImputation {
        let observed: Vec<f64> = values.iter().flatten().copied().collect();

        let fill_value = match median(&observed) {
            Some(m) => {
                debug!("Median for '{}': {:.4} ({} values)", column, m, observed.len());
                m
            }
            None => {
                warn!("Column '{}' has no values; median fill defaults to 0", column);
                0.0
            }
        };

        ColumnImputation {
            column: column.to_string(),
            strategy: ImputationStrategy::Median,
            fill_value,
        }
    }
}
