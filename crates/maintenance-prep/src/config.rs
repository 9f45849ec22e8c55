//! Configuration types for the feature preprocessor.
//!
//! This module provides configuration options using the builder pattern.
//! All locations and parameters are passed in explicitly; nothing is read
//! from ambient global state.

use crate::schema::DatasetSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default fraction of rows allocated to the validation subset.
pub const DEFAULT_SPLIT_RATIO: f64 = 0.2;

/// Default seed for the train/validation shuffle.
pub const DEFAULT_SEED: u64 = 42;

/// Root of the processing container's well-known directories.
pub const PROCESSING_ROOT: &str = "/opt/ml/processing";

/// File names written inside the output directories.
pub const TRAIN_FILE_NAME: &str = "train.csv";
pub const VALIDATION_FILE_NAME: &str = "validation.csv";
pub const STATE_FILE_NAME: &str = "transformer_state.json";
pub const REPORT_FILE_NAME: &str = "preprocessing_report.json";

/// Where the three outputs of a run are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLayout {
    pub train_dir: PathBuf,
    pub validation_dir: PathBuf,
    pub model_dir: PathBuf,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self::under(PROCESSING_ROOT)
    }
}

impl OutputLayout {
    /// `train/`, `validation/` and `model/` below a common root.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            train_dir: root.join("train"),
            validation_dir: root.join("validation"),
            model_dir: root.join("model"),
        }
    }

    pub fn train_path(&self) -> PathBuf {
        self.train_dir.join(TRAIN_FILE_NAME)
    }

    pub fn validation_path(&self) -> PathBuf {
        self.validation_dir.join(VALIDATION_FILE_NAME)
    }

    pub fn state_path(&self) -> PathBuf {
        self.model_dir.join(STATE_FILE_NAME)
    }

    pub fn report_path(&self) -> PathBuf {
        self.model_dir.join(REPORT_FILE_NAME)
    }
}

fn default_input_path() -> PathBuf {
    Path::new(PROCESSING_ROOT)
        .join("input")
        .join("predictive_maintenance_raw_data_header.csv")
}

/// Configuration for a preprocessing run.
///
/// Use [`PreprocessorConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use maintenance_prep::config::PreprocessorConfig;
///
/// let config = PreprocessorConfig::builder()
///     .input_path("data/raw.csv")
///     .output_root("out")
///     .split_ratio(0.25)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessorConfig {
    /// CSV file to read.
    /// Default: "/opt/ml/processing/input/predictive_maintenance_raw_data_header.csv"
    pub input_path: PathBuf,

    /// Output directories for train, validation and transformer state.
    pub outputs: OutputLayout,

    /// Fraction of rows in the validation subset, in (0, 1).
    /// Default: 0.2
    pub split_ratio: f64,

    /// Seed for the row shuffle.
    /// Default: 42
    pub seed: u64,

    /// Declared input columns.
    /// Default: the machine failure schema
    pub schema: DatasetSchema,

    /// Whether the feature CSVs carry a header row.
    /// Default: true
    pub include_header: bool,

    /// Whether to write a JSON run report next to the transformer state.
    /// Default: false
    pub emit_report: bool,
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            outputs: OutputLayout::default(),
            split_ratio: DEFAULT_SPLIT_RATIO,
            seed: DEFAULT_SEED,
            schema: DatasetSchema::default(),
            include_header: true,
            emit_report: false,
        }
    }
}

impl PreprocessorConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PreprocessorConfigBuilder {
        PreprocessorConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        validate_split_ratio(self.split_ratio)?;
        self.schema
            .validate()
            .map_err(|e| ConfigValidationError::InvalidSchema(e.to_string()))?;
        Ok(())
    }
}

/// Check a split ratio lies in the open interval (0, 1).
pub fn validate_split_ratio(ratio: f64) -> Result<(), ConfigValidationError> {
    if ratio.is_finite() && ratio > 0.0 && ratio < 1.0 {
        Ok(())
    } else {
        Err(ConfigValidationError::InvalidSplitRatio(ratio))
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid split ratio: {0} (must be strictly between 0.0 and 1.0)")]
    InvalidSplitRatio(f64),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
}

/// Builder for [`PreprocessorConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PreprocessorConfigBuilder {
    input_path: Option<PathBuf>,
    outputs: Option<OutputLayout>,
    split_ratio: Option<f64>,
    seed: Option<u64>,
    schema: Option<DatasetSchema>,
    include_header: Option<bool>,
    emit_report: Option<bool>,
}

impl PreprocessorConfigBuilder {
    /// Set the input CSV path.
    pub fn input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_path = Some(path.into());
        self
    }

    /// Set all three output directories explicitly.
    pub fn outputs(mut self, outputs: OutputLayout) -> Self {
        self.outputs = Some(outputs);
        self
    }

    /// Place `train/`, `validation/` and `model/` below one directory.
    pub fn output_root(mut self, root: impl AsRef<Path>) -> Self {
        self.outputs = Some(OutputLayout::under(root));
        self
    }

    /// Set the validation fraction.
    ///
    /// # Arguments
    /// * `ratio` - Value strictly between 0.0 and 1.0 (e.g., 0.2 = 20%)
    pub fn split_ratio(mut self, ratio: f64) -> Self {
        self.split_ratio = Some(ratio);
        self
    }

    /// Set the shuffle seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Override the dataset schema.
    pub fn schema(mut self, schema: DatasetSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Enable or disable the header row in feature CSVs.
    pub fn include_header(mut self, include: bool) -> Self {
        self.include_header = Some(include);
        self
    }

    /// Enable or disable writing the JSON run report.
    pub fn emit_report(mut self, emit: bool) -> Self {
        self.emit_report = Some(emit);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PreprocessorConfig` or an error if validation fails.
    pub fn build(self) -> Result<PreprocessorConfig, ConfigValidationError> {
        let config = PreprocessorConfig {
            input_path: self.input_path.unwrap_or_else(default_input_path),
            outputs: self.outputs.unwrap_or_default(),
            split_ratio: self.split_ratio.unwrap_or(DEFAULT_SPLIT_RATIO),
            seed: self.seed.unwrap_or(DEFAULT_SEED),
            schema: self.schema.unwrap_or_default(),
            include_header: self.include_header.unwrap_or(true),
            emit_report: self.emit_report.unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }
}
