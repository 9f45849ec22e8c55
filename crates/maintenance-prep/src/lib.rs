//! Predictive Maintenance Feature Preprocessing
//!
//! Turns the raw machine-failure dataset into model-ready train and
//! validation feature sets, built with Rust and Polars.
//!
//! # Overview
//!
//! A single run:
//!
//! - **Loads** the raw CSV, reading every field as text
//! - **Fits** imputation values (constant fill for failure indicators,
//!   median for measurements) and one-hot category mappings on all rows
//! - **Transforms** every row; rows are never dropped
//! - **Splits** the rows into train and validation subsets with a seeded
//!   shuffle
//! - **Writes** `train.csv`, `validation.csv` and the fitted transformer
//!   state, which reproduces the same transformation on future data
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use maintenance_prep::{Preprocessor, PreprocessorConfig};
//!
//! let config = PreprocessorConfig::builder()
//!     .input_path("data/predictive_maintenance.csv")
//!     .output_root("out")
//!     .split_ratio(0.2)
//!     .build()?;
//!
//! let outcome = Preprocessor::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run()?;
//!
//! println!(
//!     "{} train / {} validation rows",
//!     outcome.summary.rows_train, outcome.summary.rows_validation
//! );
//! ```
//!
//! # Reapplying a fitted state
//!
//! ```rust,ignore
//! use maintenance_prep::{FeatureTransformer, dataset::load_dataset};
//!
//! let transformer = FeatureTransformer::load("out/model/transformer_state.json".as_ref())?;
//! let features = transformer.transform(&load_dataset("new_batch.csv".as_ref())?)?;
//! ```
//!
//! # Jobs
//!
//! The [`jobs`] module submits runs through the [`JobRunner`] trait.
//! [`LocalJobRunner`] executes each job on a background thread, and
//! [`latest_completed_job`] finds the newest finished run for a base name.

pub mod config;
pub mod dataset;
pub mod encoders;
pub mod error;
pub mod imputers;
pub mod jobs;
pub mod pipeline;
pub mod schema;
pub mod split;
pub mod state;
pub mod transformer;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use config::{
    ConfigValidationError, OutputLayout, PreprocessorConfig, PreprocessorConfigBuilder,
};
pub use encoders::OneHotEncoder;
pub use error::{PreprocessingError, Result as PreprocessingResult, ResultExt};
pub use imputers::{ColumnImputation, ConstantImputer, ImputationStrategy, StatisticalImputer};
pub use jobs::{
    JobFilter, JobHandle, JobOutputs, JobRunner, JobSpec, JobStatus, JobSummary, LocalJobRunner,
    latest_completed_job,
};
pub use pipeline::{
    CancellationToken, ClosureProgressReporter, PreprocessingOutcome, PreprocessingStage,
    ProcessedDataset, Preprocessor, PreprocessorBuilder, ProgressReporter, ProgressUpdate,
};
pub use schema::{ColumnRole, ColumnSpec, DatasetSchema};
pub use split::{TrainValidationSplit, split_indices};
pub use state::{STATE_FORMAT_VERSION, TransformerState};
pub use transformer::{FeatureTransformer, TransformStats};
pub use types::{OutputPaths, RunSummary};
