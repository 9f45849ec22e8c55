//! Feature transformer: fit imputation and encoding, then apply them.
//!
//! Output layout is fixed by the fitted state: the label first, then the
//! numeric measurements, then the remaining failure indicators, then the
//! one-hot columns, each group in schema order. Identifier columns are
//! dropped.

use crate::encoders::OneHotEncoder;
use crate::error::{PreprocessingError, Result};
use crate::imputers::{ColumnImputation, ConstantImputer, StatisticalImputer};
use crate::schema::{ColumnRole, DatasetSchema};
use crate::state::{STATE_FORMAT_VERSION, TransformerState};
use crate::utils::{parse_f64, parse_flag, present, raw_values};
use chrono::Utc;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Per-column counts gathered while transforming.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformStats {
    pub rows: usize,
    /// Values filled by imputation, per column (only non-zero entries).
    pub imputed: BTreeMap<String, usize>,
    /// Missing or unseen categorical values, per column (only non-zero entries).
    pub unencoded: BTreeMap<String, usize>,
}

impl TransformStats {
    pub fn total_imputed(&self) -> usize {
        self.imputed.values().sum()
    }

    pub fn total_unencoded(&self) -> usize {
        self.unencoded.values().sum()
    }
}

/// A fitted transformer wrapping an immutable [`TransformerState`].
#[derive(Debug, Clone)]
pub struct FeatureTransformer {
    state: TransformerState,
}

impl FeatureTransformer {
    /// Learn imputation values and category mappings from `df`.
    pub fn fit(df: &DataFrame, schema: &DatasetSchema) -> Result<Self> {
        schema.validate()?;
        schema.validate_columns(&column_names(df))?;

        info!("Fitting transformer on {} rows", df.height());

        let mut imputations = Vec::new();
        let mut encodings = Vec::new();

        for spec in &schema.columns {
            match spec.role {
                ColumnRole::Identifier => {}
                ColumnRole::Numeric => {
                    let values = numeric_values(df, &spec.name)?;
                    imputations.push(StatisticalImputer::fit_median(&spec.name, &values));
                }
                ColumnRole::Indicator { .. } => {
                    if let Some(rule) = ConstantImputer::fit(spec) {
                        imputations.push(rule);
                    }
                }
                ColumnRole::Categorical => {
                    let values = categorical_values(df, &spec.name)?;
                    let encoder = OneHotEncoder::fit(spec.name.clone(), &values);
                    debug!("Categories for '{}': {:?}", spec.name, encoder.categories);
                    encodings.push(encoder);
                }
            }
        }

        let feature_columns = feature_layout(schema, &encodings);

        Ok(Self {
            state: TransformerState {
                format_version: STATE_FORMAT_VERSION,
                fitted_at: Utc::now().to_rfc3339(),
                schema: schema.clone(),
                rows_fitted: df.height(),
                imputations,
                encodings,
                feature_columns,
            },
        })
    }

    /// Rebuild a transformer from persisted state.
    pub fn from_state(state: TransformerState) -> Result<Self> {
        state.schema.validate()?;

        for spec in &state.schema.columns {
            let consistent = match spec.role {
                ColumnRole::Identifier => true,
                ColumnRole::Numeric | ColumnRole::Indicator { .. } => {
                    state.imputation(&spec.name).is_some()
                }
                ColumnRole::Categorical => state.encoder(&spec.name).is_some(),
            };
            if !consistent {
                return Err(PreprocessingError::InvalidSchema(format!(
                    "transformer state has no fitted parameters for '{}'",
                    spec.name
                )));
            }
        }

        if feature_layout(&state.schema, &state.encodings) != state.feature_columns {
            return Err(PreprocessingError::InvalidSchema(
                "transformer state feature columns do not match its schema".to_string(),
            ));
        }

        Ok(Self { state })
    }

    /// Load a transformer from a state file.
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_state(TransformerState::load(path)?)
    }

    /// Persist the fitted state.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.state.save(path)
    }

    pub fn state(&self) -> &TransformerState {
        &self.state
    }

    pub fn into_state(self) -> TransformerState {
        self.state
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.state.feature_columns
    }

    /// Apply the fitted imputation and encoding to `df`.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        self.transform_with_stats(df).map(|(out, _)| out)
    }

    /// Like [`transform`](Self::transform), also returning per-column counts.
    pub fn transform_with_stats(&self, df: &DataFrame) -> Result<(DataFrame, TransformStats)> {
        let schema = &self.state.schema;
        schema.validate_columns(&column_names(df))?;

        let mut stats = TransformStats {
            rows: df.height(),
            ..Default::default()
        };
        let mut columns: Vec<Column> = Vec::with_capacity(self.state.feature_columns.len());

        for name in ordered_inputs(schema) {
            let Some(spec) = schema.column(name) else {
                continue;
            };
            let rule = self.fitted_imputation(name)?;

            match spec.role {
                ColumnRole::Numeric => {
                    let mut values = numeric_values(df, name)?;
                    record(&mut stats.imputed, name, rule.apply(&mut values));
                    let filled: Vec<f64> = values.into_iter().flatten().collect();
                    columns.push(Series::new(name.into(), filled).into());
                }
                ColumnRole::Indicator { .. } => {
                    let mut values = indicator_values(df, name)?;
                    record(&mut stats.imputed, name, rule.apply_flags(&mut values));
                    let filled: Vec<i64> = values.into_iter().flatten().collect();
                    columns.push(Series::new(name.into(), filled).into());
                }
                _ => {}
            }
        }

        for encoder in &self.state.encodings {
            let values = categorical_values(df, &encoder.column)?;
            let encoded = encoder.encode_column(&values);

            if encoded.unencoded > 0 {
                warn!(
                    "'{}': {} missing or unseen values encoded as all zeros",
                    encoder.column, encoded.unencoded
                );
            }
            record(&mut stats.unencoded, &encoder.column, encoded.unencoded);

            let features = encoder.feature_names().into_iter().zip(encoded.indicators);
            for (feature, indicators) in features {
                columns.push(Series::new(feature.into(), indicators).into());
            }
        }

        let out = DataFrame::new(columns)?;
        debug_assert_eq!(
            column_names(&out),
            self.state.feature_columns,
            "transform output must follow the fitted layout"
        );

        debug!(
            "Transformed {} rows: {} imputed, {} unencoded",
            stats.rows,
            stats.total_imputed(),
            stats.total_unencoded()
        );
        Ok((out, stats))
    }

    fn fitted_imputation(&self, column: &str) -> Result<&ColumnImputation> {
        self.state.imputation(column).ok_or_else(|| {
            PreprocessingError::Internal(format!("no fitted imputation for '{}'", column))
        })
    }
}

/// Label first, then numerics, then the other indicators, in schema order.
fn ordered_inputs(schema: &DatasetSchema) -> Vec<&str> {
    let mut names = vec![schema.label.as_str()];
    names.extend(schema.names_where(|r| matches!(r, ColumnRole::Numeric)));
    names.extend(
        schema
            .names_where(|r| matches!(r, ColumnRole::Indicator { .. }))
            .into_iter()
            .filter(|n| *n != schema.label),
    );
    names
}

fn feature_layout(schema: &DatasetSchema, encodings: &[OneHotEncoder]) -> Vec<String> {
    let mut layout: Vec<String> = ordered_inputs(schema).into_iter().map(String::from).collect();
    for encoder in encodings {
        layout.extend(encoder.feature_names());
    }
    layout
}

fn record(counts: &mut BTreeMap<String, usize>, column: &str, n: usize) {
    if n > 0 {
        *counts.entry(column.to_string()).or_insert(0) += n;
    }
}

fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

fn numeric_values(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>> {
    parse_column(df, column, "a number", parse_f64)
}

fn indicator_values(df: &DataFrame, column: &str) -> Result<Vec<Option<i64>>> {
    parse_column(df, column, "an integer flag", parse_flag)
}

fn categorical_values(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>> {
    let raw = raw_values(df.column(column)?)?;
    Ok(raw
        .iter()
        .map(|v| present(v.as_deref()).map(str::to_string))
        .collect())
}

/// Parse every present value of a column, failing on the first bad one.
fn parse_column<T>(
    df: &DataFrame,
    column: &str,
    expected: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Vec<Option<T>>> {
    let raw = raw_values(df.column(column)?)?;
    raw.iter()
        .enumerate()
        .map(|(row, v)| match present(v.as_deref()) {
            None => Ok(None),
            Some(text) => parse(text).map(Some).ok_or_else(|| PreprocessingError::InvalidValue {
                column: column.to_string(),
                row,
                value: text.to_string(),
                expected,
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnSpec;

    fn i64_column(df: &DataFrame, name: &str) -> Vec<Option<i64>> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .into_iter()
            .collect()
    }

    fn f64_column(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    fn small_schema() -> DatasetSchema {
        DatasetSchema {
            columns: vec![
                ColumnSpec::new("id", ColumnRole::Identifier),
                ColumnSpec::new("kind", ColumnRole::Categorical),
                ColumnSpec::new("temp", ColumnRole::Numeric),
                ColumnSpec::new("failed", ColumnRole::indicator()),
                ColumnSpec::new("flag", ColumnRole::indicator()),
            ],
            label: "failed".to_string(),
        }
    }

    fn small_df() -> DataFrame {
        df![
            "id" => ["1", "2", "3", "4"],
            "kind" => [Some("B"), Some("A"), None, Some("C")],
            "temp" => [Some("10.0"), None, Some("30"), Some("20")],
            "failed" => [Some("0"), Some("1"), None, Some("0")],
            "flag" => [None, Some("1"), Some("NA"), Some("0")],
        ]
        .unwrap()
    }

    #[test]
    fn test_fit_learns_parameters() {
        let transformer = FeatureTransformer::fit(&small_df(), &small_schema()).unwrap();
        let state = transformer.state();

        assert_eq!(state.rows_fitted, 4);
        assert_eq!(state.imputation("temp").unwrap().fill_value, 20.0);
        assert_eq!(state.imputation("failed").unwrap().fill_value, 0.0);
        assert_eq!(state.encoder("kind").unwrap().categories, vec!["A", "B", "C"]);
        assert_eq!(
            state.feature_columns,
            vec!["failed", "temp", "flag", "kind_A", "kind_B", "kind_C"]
        );
    }

    #[test]
    fn test_transform_imputes_without_dropping_rows() {
        let transformer = FeatureTransformer::fit(&small_df(), &small_schema()).unwrap();
        let (out, stats) = transformer.transform_with_stats(&small_df()).unwrap();

        assert_eq!(out.height(), 4);
        assert_eq!(out.width(), 6);

        let failed = i64_column(&out, "failed");
        assert_eq!(failed, vec![Some(0), Some(1), Some(0), Some(0)]);

        let temp = f64_column(&out, "temp");
        assert_eq!(temp, vec![Some(10.0), Some(20.0), Some(30.0), Some(20.0)]);

        assert_eq!(stats.imputed.get("flag"), Some(&2));
        assert_eq!(stats.imputed.get("failed"), Some(&1));
        assert_eq!(stats.unencoded.get("kind"), Some(&1));
    }

    #[test]
    fn test_transform_encodes_unseen_as_zeros() {
        let transformer = FeatureTransformer::fit(&small_df(), &small_schema()).unwrap();
        let unseen = df![
            "id" => ["9"],
            "kind" => ["Z"],
            "temp" => ["1.5"],
            "failed" => ["1"],
            "flag" => ["0"],
        ]
        .unwrap();

        let out = transformer.transform(&unseen).unwrap();
        for name in ["kind_A", "kind_B", "kind_C"] {
            let v = i64_column(&out, name);
            assert_eq!(v, vec![Some(0)], "{} should be zero", name);
        }
    }

    #[test]
    fn test_large_flag_values_keep_integer_precision() {
        let transformer = FeatureTransformer::fit(&small_df(), &small_schema()).unwrap();
        let big = (1i64 << 53) + 1;
        let df = df![
            "id" => ["1", "2"],
            "kind" => ["A", "B"],
            "temp" => ["1.0", "2.0"],
            "failed" => ["0", "1"],
            "flag" => [Some(big.to_string()), None],
        ]
        .unwrap();

        let out = transformer.transform(&df).unwrap();
        assert_eq!(i64_column(&out, "flag"), vec![Some(big), Some(0)]);
    }

    #[test]
    fn test_transform_missing_column_is_schema_error() {
        let transformer = FeatureTransformer::fit(&small_df(), &small_schema()).unwrap();
        let df = small_df().drop("temp").unwrap();

        let err = transformer.transform(&df).unwrap_err();
        assert!(matches!(err, PreprocessingError::MissingColumn(ref c) if c == "temp"));
        assert_eq!(err.error_code(), "SCHEMA_ERROR");
    }

    #[test]
    fn test_invalid_numeric_value() {
        let df = df![
            "id" => ["1"],
            "kind" => ["A"],
            "temp" => ["warm"],
            "failed" => ["0"],
            "flag" => ["0"],
        ]
        .unwrap();

        match FeatureTransformer::fit(&df, &small_schema()) {
            Err(PreprocessingError::InvalidValue { column, row, value, .. }) => {
                assert_eq!(column, "temp");
                assert_eq!(row, 0);
                assert_eq!(value, "warm");
            }
            other => panic!("expected invalid value, got {:?}", other),
        }
    }

    #[test]
    fn test_state_restores_identical_output() {
        let fitted = FeatureTransformer::fit(&small_df(), &small_schema()).unwrap();
        let restored = FeatureTransformer::from_state(fitted.state().clone()).unwrap();

        let a = fitted.transform(&small_df()).unwrap();
        let b = restored.transform(&small_df()).unwrap();
        assert!(a.equals_missing(&b));
    }

    #[test]
    fn test_from_state_rejects_inconsistent_layout() {
        let fitted = FeatureTransformer::fit(&small_df(), &small_schema()).unwrap();
        let mut state = fitted.into_state();
        state.feature_columns.pop();

        assert!(FeatureTransformer::from_state(state).is_err());
    }
}
