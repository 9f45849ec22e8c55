//! Fixed dataset schema for machine-operation records.
//!
//! The preprocessor never infers types: every column it reads is declared
//! here together with the role that decides how it is imputed and encoded.

use crate::error::{PreprocessingError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How a column takes part in preprocessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnRole {
    /// Row identity only; never emitted as a feature.
    Identifier,
    /// Continuous measurement; missing values get the fitted median.
    Numeric,
    /// Category code; one-hot encoded.
    Categorical,
    /// Failure-indicator flag; missing values get a fixed constant.
    Indicator { fill_value: i64 },
}

impl ColumnRole {
    /// Failure indicator filled with zero.
    pub const fn indicator() -> Self {
        ColumnRole::Indicator { fill_value: 0 }
    }
}

/// A single declared column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub role: ColumnRole,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, role: ColumnRole) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }
}

/// The static column set of an input dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSchema {
    /// Declared columns in input order.
    pub columns: Vec<ColumnSpec>,
    /// Name of the binary label column (must be an indicator).
    pub label: String,
}

impl Default for DatasetSchema {
    fn default() -> Self {
        Self::machine_failure()
    }
}

impl DatasetSchema {
    /// Schema of the predictive-maintenance machine failure dataset.
    pub fn machine_failure() -> Self {
        use ColumnRole::*;

        let columns = vec![
            ColumnSpec::new("UDI", Identifier),
            ColumnSpec::new("Product ID", Identifier),
            ColumnSpec::new("Type", Categorical),
            ColumnSpec::new("Air temperature [K]", Numeric),
            ColumnSpec::new("Process temperature [K]", Numeric),
            ColumnSpec::new("Rotational speed [rpm]", Numeric),
            ColumnSpec::new("Torque [Nm]", Numeric),
            ColumnSpec::new("Tool wear [min]", Numeric),
            ColumnSpec::new("Machine failure", ColumnRole::indicator()),
            ColumnSpec::new("TWF", ColumnRole::indicator()),
            ColumnSpec::new("HDF", ColumnRole::indicator()),
            ColumnSpec::new("PWF", ColumnRole::indicator()),
            ColumnSpec::new("OSF", ColumnRole::indicator()),
            ColumnSpec::new("RNF", ColumnRole::indicator()),
        ];

        Self {
            columns,
            label: "Machine failure".to_string(),
        }
    }

    /// Look up a declared column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Names of declared columns with the given role kind.
    pub fn names_where(&self, predicate: impl Fn(&ColumnRole) -> bool) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| predicate(&c.role))
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Check the schema is internally consistent.
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(PreprocessingError::InvalidSchema(
                "schema declares no columns".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for spec in &self.columns {
            if spec.name.trim().is_empty() {
                return Err(PreprocessingError::InvalidSchema(
                    "column names must not be empty".to_string(),
                ));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(PreprocessingError::InvalidSchema(format!(
                    "column '{}' is declared twice",
                    spec.name
                )));
            }
        }

        match self.column(&self.label) {
            Some(spec) if matches!(spec.role, ColumnRole::Indicator { .. }) => Ok(()),
            Some(_) => Err(PreprocessingError::InvalidSchema(format!(
                "label column '{}' must be an indicator column",
                self.label
            ))),
            None => Err(PreprocessingError::InvalidSchema(format!(
                "label column '{}' is not declared",
                self.label
            ))),
        }
    }

    /// Fail with a schema error naming the first declared column that is
    /// absent from `available`. Extra columns are ignored.
    pub fn validate_columns<S: AsRef<str>>(&self, available: &[S]) -> Result<()> {
        let present: HashSet<&str> = available.iter().map(|s| s.as_ref()).collect();
        match self.columns.iter().find(|c| !present.contains(c.name.as_str())) {
            Some(missing) => Err(PreprocessingError::MissingColumn(missing.name.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_failure_schema_is_valid() {
        let schema = DatasetSchema::machine_failure();
        assert!(schema.validate().is_ok());
        assert_eq!(schema.columns.len(), 14);
        assert_eq!(
            schema.names_where(|r| matches!(r, ColumnRole::Categorical)),
            vec!["Type"]
        );
        assert_eq!(schema.names_where(|r| matches!(r, ColumnRole::Numeric)).len(), 5);
    }

    #[test]
    fn test_validate_columns_reports_first_missing() {
        let schema = DatasetSchema::machine_failure();
        let mut names: Vec<String> = schema.columns.iter().map(|c| c.name.clone()).collect();
        names.retain(|n| n != "Torque [Nm]" && n != "RNF");
        names.push("extra".to_string());

        match schema.validate_columns(&names) {
            Err(PreprocessingError::MissingColumn(col)) => assert_eq!(col, "Torque [Nm]"),
            other => panic!("expected missing column, got {:?}", other),
        }
    }

    #[test]
    fn test_label_must_be_indicator() {
        let mut schema = DatasetSchema::machine_failure();
        schema.label = "Type".to_string();
        assert!(matches!(
            schema.validate(),
            Err(PreprocessingError::InvalidSchema(_))
        ));

        schema.label = "nope".to_string();
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let schema = DatasetSchema {
            columns: vec![
                ColumnSpec::new("a", ColumnRole::indicator()),
                ColumnSpec::new("a", ColumnRole::Numeric),
            ],
            label: "a".to_string(),
        };
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_role_json_shape() {
        let json = serde_json::to_string(&ColumnRole::Indicator { fill_value: 0 }).unwrap();
        assert_eq!(json, r#"{"kind":"indicator","fill_value":0}"#);
        let role: ColumnRole = serde_json::from_str(r#"{"kind":"numeric"}"#).unwrap();
        assert_eq!(role, ColumnRole::Numeric);
    }
}
