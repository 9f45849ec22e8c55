//! Custom error types for the feature preprocessor.
//!
//! This module provides a single error hierarchy using `thiserror`.
//! Every failure is fatal to the run that raised it; nothing is retried
//! internally. Errors serialize as `{code, message}` so a job runner or a
//! calling process can report them without parsing the display text.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

use crate::config::ConfigValidationError;

/// The main error type for the preprocessor.
#[derive(Error, Debug)]
pub enum PreprocessingError {
    /// Run was cancelled (e.g. a job stop request).
    #[error("Preprocessing cancelled")]
    Cancelled,

    /// An expected schema column is absent from the input.
    #[error("Column '{0}' not found in dataset")]
    MissingColumn(String),

    /// Invalid configuration provided (e.g. split ratio outside (0, 1)).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The dataset schema itself is inconsistent.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// A present value could not be parsed for its column's role.
    #[error("Invalid value '{value}' in column '{column}' at row {row}: expected {expected}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
        expected: &'static str,
    },

    /// A persisted transformer state was written by an incompatible version.
    #[error("Transformer state format version {found} is not supported (expected {expected})")]
    IncompatibleState { found: u32, expected: u32 },

    /// No job matched the lookup.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Outputs were requested for a job that has not completed.
    #[error("Job '{job}' has not completed (status: {status})")]
    JobNotComplete { job: String, status: String },

    /// Job base name does not satisfy the naming rule.
    #[error(
        "Invalid job name '{0}': use 1-63 alphanumerics or hyphens, not starting with a hyphen"
    )]
    InvalidJobName(String),

    /// Internal error (e.g., thread join failure).
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PreprocessingError>,
    },
}

impl PreprocessingError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PreprocessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code.
    ///
    /// Codes group the variants into the three fatal families of a run
    /// (schema, value and IO) plus job and control-flow codes.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Cancelled => "CANCELLED",
            Self::MissingColumn(_) => "SCHEMA_ERROR",
            Self::InvalidSchema(_) => "SCHEMA_ERROR",
            Self::InvalidConfig(_) => "VALUE_ERROR",
            Self::InvalidValue { .. } => "VALUE_ERROR",
            Self::IncompatibleState { .. } => "INCOMPATIBLE_STATE",
            Self::JobNotFound(_) => "JOB_NOT_FOUND",
            Self::JobNotComplete { .. } => "JOB_NOT_COMPLETE",
            Self::InvalidJobName(_) => "INVALID_JOB_NAME",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(e) => match e {
                polars::error::PolarsError::IO { .. } => "IO_ERROR",
                polars::error::PolarsError::ColumnNotFound(_) => "SCHEMA_ERROR",
                _ => "POLARS_ERROR",
            },
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error represents a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

impl From<ConfigValidationError> for PreprocessingError {
    fn from(err: ConfigValidationError) -> Self {
        PreprocessingError::InvalidConfig(err.to_string())
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for PreprocessingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PreprocessingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for preprocessing operations.
pub type Result<T> = std::result::Result<T, PreprocessingError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PreprocessingError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PreprocessingError::Io(e).with_context(context))
    }
}
