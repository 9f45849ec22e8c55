//! Result types returned by a preprocessing run.

use crate::config::{OutputLayout, PreprocessorConfig};
use crate::transformer::TransformStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

// ============================================================================
// Output Paths
// ============================================================================

/// Files written by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPaths {
    pub train: PathBuf,
    pub validation: PathBuf,
    pub state: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<PathBuf>,
}

impl OutputPaths {
    /// Paths a run with `config` writes to.
    pub fn for_config(config: &PreprocessorConfig) -> Self {
        Self::from_layout(&config.outputs, config.emit_report)
    }

    pub fn from_layout(layout: &OutputLayout, with_report: bool) -> Self {
        Self {
            train: layout.train_path(),
            validation: layout.validation_path(),
            state: layout.state_path(),
            report: with_report.then(|| layout.report_path()),
        }
    }
}

// ============================================================================
// Run Summary
// ============================================================================

/// Human-readable summary of what a run did.
///
/// Printed by the CLI and written as the optional JSON report.
///
/// # Example
///
/// ```rust,ignore
/// let outcome = preprocessor.run()?;
/// let summary = &outcome.summary;
/// println!(
///     "{} rows -> {} train / {} validation in {}ms",
///     summary.rows_total, summary.rows_train, summary.rows_validation, summary.duration_ms
/// );
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// When the run started (UTC).
    pub started_at: DateTime<Utc>,
    /// Total execution time in milliseconds.
    pub duration_ms: u64,

    pub input_path: PathBuf,

    /// Rows read from the input.
    pub rows_total: usize,
    /// Rows in the train subset.
    pub rows_train: usize,
    /// Rows in the validation subset.
    pub rows_validation: usize,

    pub split_ratio: f64,
    pub seed: u64,

    /// Number of output feature columns (label included).
    pub feature_count: usize,
    /// Output column order.
    pub feature_columns: Vec<String>,

    /// Values filled by imputation, per column.
    pub imputed: BTreeMap<String, usize>,
    /// Missing or unseen categorical values encoded as all zeros, per column.
    pub unencoded: BTreeMap<String, usize>,

    pub outputs: OutputPaths,
}

impl RunSummary {
    /// Total number of imputed values across all columns.
    pub fn total_imputed(&self) -> usize {
        self.imputed.values().sum()
    }

    /// Total number of unencodable categorical values across all columns.
    pub fn total_unencoded(&self) -> usize {
        self.unencoded.values().sum()
    }

    /// Observed validation fraction (0.0 for an empty input).
    pub fn validation_fraction(&self) -> f64 {
        if self.rows_total == 0 {
            0.0
        } else {
            self.rows_validation as f64 / self.rows_total as f64
        }
    }

    pub(crate) fn record_stats(&mut self, stats: &TransformStats) {
        self.imputed = stats.imputed.clone();
        self.unencoded = stats.unencoded.clone();
    }
}
