//! Seeded train/validation split.

use crate::config::validate_split_ratio;
use crate::error::Result;
use polars::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Row indices of the two subsets, each in ascending input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainValidationSplit {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

impl TrainValidationSplit {
    pub fn total(&self) -> usize {
        self.train.len() + self.validation.len()
    }

    /// Select the train rows of `df`.
    pub fn train_frame(&self, df: &DataFrame) -> Result<DataFrame> {
        take_rows(df, &self.train)
    }

    /// Select the validation rows of `df`.
    pub fn validation_frame(&self, df: &DataFrame) -> Result<DataFrame> {
        take_rows(df, &self.validation)
    }
}

/// Number of validation rows: `round(n_rows * ratio)`, half away from zero.
pub fn validation_size(n_rows: usize, ratio: f64) -> usize {
    ((n_rows as f64) * ratio).round() as usize
}

/// Split `0..n_rows` into disjoint train and validation index sets.
///
/// The shuffle is driven by a `StdRng` seeded from `seed`, so the same
/// inputs always give the same split.
pub fn split_indices(n_rows: usize, ratio: f64, seed: u64) -> Result<TrainValidationSplit> {
    validate_split_ratio(ratio)?;

    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_validation = validation_size(n_rows, ratio).min(n_rows);
    let mut validation = indices[..n_validation].to_vec();
    let mut train = indices[n_validation..].to_vec();
    validation.sort_unstable();
    train.sort_unstable();

    debug!(
        "Split {} rows: {} train, {} validation (seed {})",
        n_rows,
        train.len(),
        validation.len(),
        seed
    );

    Ok(TrainValidationSplit { train, validation })
}

fn take_rows(df: &DataFrame, rows: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec("rows".into(), rows.iter().map(|&r| r as IdxSize).collect());
    Ok(df.take(&idx)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PreprocessingError;
    use std::collections::HashSet;

    #[test]
    fn test_ten_thousand_rows_at_twenty_percent() {
        let split = split_indices(10_000, 0.2, 42).unwrap();
        assert_eq!(split.validation.len(), 2_000);
        assert_eq!(split.train.len(), 8_000);
    }

    #[test]
    fn test_disjoint_and_complete() {
        let split = split_indices(537, 0.3, 7).unwrap();

        let train: HashSet<usize> = split.train.iter().copied().collect();
        let validation: HashSet<usize> = split.validation.iter().copied().collect();
        assert!(train.is_disjoint(&validation));

        let union: HashSet<usize> = train.union(&validation).copied().collect();
        assert_eq!(union, (0..537).collect::<HashSet<_>>());
        assert_eq!(split.total(), 537);
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = split_indices(1_000, 0.2, 123).unwrap();
        let b = split_indices(1_000, 0.2, 123).unwrap();
        let c = split_indices(1_000, 0.2, 124).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.validation, c.validation);
    }

    #[test]
    fn test_ratio_within_rounding() {
        for ratio in [0.01, 0.1, 0.25, 0.333, 0.5, 0.75, 0.99] {
            let split = split_indices(101, ratio, 1).unwrap();
            let observed = split.validation.len() as f64 / 101.0;
            assert!(
                (observed - ratio).abs() <= 0.5 / 101.0 + f64::EPSILON,
                "ratio {} gave {}",
                ratio,
                observed
            );
        }
    }

    #[test]
    fn test_invalid_ratio_is_value_error() {
        for ratio in [0.0, 1.0, -1.0, 2.0] {
            let err = split_indices(10, ratio, 42).unwrap_err();
            assert!(matches!(err, PreprocessingError::InvalidConfig(_)));
            assert_eq!(err.error_code(), "VALUE_ERROR");
        }
    }

    #[test]
    fn test_empty_dataset() {
        let split = split_indices(0, 0.2, 42).unwrap();
        assert!(split.train.is_empty());
        assert!(split.validation.is_empty());
    }

    #[test]
    fn test_frames_follow_indices() {
        let df = df!["id" => [10i64, 11, 12, 13, 14]].unwrap();
        let split = TrainValidationSplit {
            train: vec![0, 2, 4],
            validation: vec![1, 3],
        };

        let validation = split.validation_frame(&df).unwrap();
        let ids: Vec<Option<i64>> = validation
            .column("id")
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(ids, vec![Some(11), Some(13)]);
        assert_eq!(split.train_frame(&df).unwrap().height(), 3);
    }
}
