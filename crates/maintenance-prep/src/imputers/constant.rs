//! Constant imputation for failure-indicator columns.

use super::{ColumnImputation, ImputationStrategy};
use crate::schema::{ColumnRole, ColumnSpec};

/// Builds constant fill rules from the declared schema.
pub struct ConstantImputer;

impl ConstantImputer {
    /// Rule for an indicator column, or `None` for any other role.
    ///
    /// The fill value comes from the schema, not from data: a missing
    /// failure flag means the failure was not recorded.
    pub fn fit(spec: &ColumnSpec) -> Option<ColumnImputation> {
        match spec.role {
            ColumnRole::Indicator { fill_value } => Some(ColumnImputation {
                column: spec.name.clone(),
                strategy: ImputationStrategy::Constant,
                fill_value: fill_value as f64,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_indicator() {
        let spec = ColumnSpec::new("HDF", ColumnRole::indicator());
        let rule = ConstantImputer::fit(&spec).unwrap();
        assert_eq!(rule.column, "HDF");
        assert_eq!(rule.strategy, ImputationStrategy::Constant);
        assert_eq!(rule.fill_value, 0.0);
    }

    #[test]
    fn test_fit_custom_fill() {
        let spec = ColumnSpec::new("flag", ColumnRole::Indicator { fill_value: -1 });
        assert_eq!(ConstantImputer::fit(&spec).unwrap().fill_value, -1.0);
    }

    #[test]
    fn test_fit_ignores_other_roles() {
        let kind = ColumnSpec::new("Type", ColumnRole::Categorical);
        assert!(ConstantImputer::fit(&kind).is_none());
        let torque = ColumnSpec::new("Torque [Nm]", ColumnRole::Numeric);
        assert!(ConstantImputer::fit(&torque).is_none());
    }
}
