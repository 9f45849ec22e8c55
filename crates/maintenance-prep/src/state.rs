//! Persisted transformer state.
//!
//! The state is everything needed to reapply imputation and encoding to a
//! future dataset with the same schema. It is written once per run as
//! pretty JSON and carries a format version that is checked on load.

use crate::encoders::OneHotEncoder;
use crate::error::{PreprocessingError, Result, ResultExt};
use crate::imputers::ColumnImputation;
use crate::schema::DatasetSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Current on-disk format version of [`TransformerState`].
pub const STATE_FORMAT_VERSION: u32 = 1;

/// Fitted, immutable preprocessing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerState {
    pub format_version: u32,
    /// RFC 3339 timestamp of the fit.
    pub fitted_at: String,
    pub schema: DatasetSchema,
    pub rows_fitted: usize,
    pub imputations: Vec<ColumnImputation>,
    pub encodings: Vec<OneHotEncoder>,
    /// Output column order.
    pub feature_columns: Vec<String>,
}

#[derive(Deserialize)]
struct VersionProbe {
    format_version: u32,
}

impl TransformerState {
    /// Fitted imputation rule for a column.
    pub fn imputation(&self, column: &str) -> Option<&ColumnImputation> {
        self.imputations.iter().find(|i| i.column == column)
    }

    /// Fitted encoder for a column.
    pub fn encoder(&self, column: &str) -> Option<&OneHotEncoder> {
        self.encodings.iter().find(|e| e.column == column)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse JSON, rejecting incompatible format versions before decoding
    /// the rest of the document.
    pub fn from_json(json: &str) -> Result<Self> {
        let probe: VersionProbe = serde_json::from_str(json)?;
        if probe.format_version != STATE_FORMAT_VERSION {
            return Err(PreprocessingError::IncompatibleState {
                found: probe.format_version,
                expected: STATE_FORMAT_VERSION,
            });
        }
        Ok(serde_json::from_str(json)?)
    }

    /// Write the state to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, self.to_json()?)
            .context(format!("Failed to write {}", path.display()))?;

        info!("Transformer state saved: {}", path.display());
        Ok(())
    }

    /// Read a state previously written by [`save`](Self::save).
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .context(format!("Failed to read {}", path.display()))?;
        Self::from_json(&json).context(format!("Invalid transformer state {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imputers::ImputationStrategy;

    fn sample_state() -> TransformerState {
        TransformerState {
            format_version: STATE_FORMAT_VERSION,
            fitted_at: "2026-01-01T00:00:00+00:00".to_string(),
            schema: DatasetSchema::machine_failure(),
            rows_fitted: 3,
            imputations: vec![ColumnImputation {
                column: "TWF".to_string(),
                strategy: ImputationStrategy::Constant,
                fill_value: 0.0,
            }],
            encodings: vec![OneHotEncoder {
                column: "Type".to_string(),
                categories: vec!["H".to_string(), "L".to_string(), "M".to_string()],
            }],
            feature_columns: vec!["Machine failure".to_string()],
        }
    }

    #[test]
    fn test_lookup_helpers() {
        let state = sample_state();
        assert!(state.imputation("TWF").is_some());
        assert!(state.imputation("HDF").is_none());
        assert_eq!(state.encoder("Type").unwrap().categories.len(), 3);
    }

    #[test]
    fn test_json_preserves_state() {
        let state = sample_state();
        let parsed = TransformerState::from_json(&state.to_json().unwrap()).unwrap();
        assert_eq!(parsed, state);
    }

    #[test]
    fn test_rejects_other_format_version() {
        let mut state = sample_state();
        state.format_version = STATE_FORMAT_VERSION + 1;
        let json = serde_json::to_string(&state).unwrap();

        match TransformerState::from_json(&json) {
            Err(PreprocessingError::IncompatibleState { found, expected }) => {
                assert_eq!(found, STATE_FORMAT_VERSION + 1);
                assert_eq!(expected, STATE_FORMAT_VERSION);
            }
            other => panic!("expected incompatible state, got {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = TransformerState::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }
}
