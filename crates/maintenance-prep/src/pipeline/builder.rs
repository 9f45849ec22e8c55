//! The preprocessor and its builder.
//!
//! A run loads the raw CSV, fits the feature transformer on all rows,
//! transforms them, splits the result into train and validation subsets and
//! writes both subsets plus the fitted state.

use crate::config::{ConfigValidationError, PreprocessorConfig};
use crate::dataset::{load_dataset, write_csv};
use crate::error::{PreprocessingError, Result, ResultExt};
use crate::pipeline::progress::{
    CancellationToken, ClosureProgressReporter, PreprocessingStage, ProgressReporter,
    ProgressUpdate,
};
use crate::split::{TrainValidationSplit, split_indices};
use crate::transformer::{FeatureTransformer, TransformStats};
use crate::types::{OutputPaths, RunSummary};
use chrono::Utc;
use polars::prelude::*;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// In-memory result of [`Preprocessor::process`].
#[derive(Debug, Clone)]
pub struct ProcessedDataset {
    pub train: DataFrame,
    pub validation: DataFrame,
    pub transformer: FeatureTransformer,
    pub split: TrainValidationSplit,
    pub stats: TransformStats,
}

/// Result of a completed [`Preprocessor::run`].
#[derive(Debug, Clone)]
pub struct PreprocessingOutcome {
    pub summary: RunSummary,
    /// Input row indices of each subset.
    pub split: TrainValidationSplit,
}

/// The feature preprocessor.
///
/// Use [`Preprocessor::builder()`] to create one.
///
/// # Example
///
/// ```rust,ignore
/// use maintenance_prep::{Preprocessor, PreprocessorConfig};
///
/// let config = PreprocessorConfig::builder()
///     .input_path("data/raw.csv")
///     .output_root("out")
///     .split_ratio(0.2)
///     .build()?;
///
/// let outcome = Preprocessor::builder()
///     .config(config)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .run()?;
///
/// println!("{} train rows", outcome.summary.rows_train);
/// ```
pub struct Preprocessor {
    config: PreprocessorConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: CancellationToken,
}

// Job runners move the preprocessor onto a worker thread.
static_assertions::assert_impl_all!(Preprocessor: Send);

impl Preprocessor {
    /// Create a new preprocessor builder.
    pub fn builder() -> PreprocessorBuilder {
        PreprocessorBuilder::default()
    }

    pub fn config(&self) -> &PreprocessorConfig {
        &self.config
    }

    /// Fit, transform and split an already loaded DataFrame. Nothing is
    /// written.
    ///
    /// # Errors
    ///
    /// Returns `Err(PreprocessingError::Cancelled)` if cancellation was
    /// requested, a schema error if a declared column is missing, and a
    /// value error for unparsable fields.
    pub fn process(&self, df: &DataFrame) -> Result<ProcessedDataset> {
        let result = self.process_stages(df);
        self.finish(result, "Preprocessing completed")
    }

    /// Load the configured input, process it and write all outputs.
    ///
    /// The three outputs are written one after another; a failure part way
    /// through can leave earlier files in place.
    pub fn run(&self) -> Result<PreprocessingOutcome> {
        let result = self.run_internal();
        self.finish(result, "Preprocessing run completed")
    }

    fn finish<T>(&self, result: Result<T>, message: &str) -> Result<T> {
        match result {
            Ok(value) => {
                self.report_progress(ProgressUpdate::complete(message));
                Ok(value)
            }
            Err(e) => {
                if e.is_cancelled() {
                    self.report_progress(ProgressUpdate::cancelled());
                } else {
                    self.report_progress(ProgressUpdate::failed(e.to_string()));
                }
                error!("Preprocessing error: {}", e);
                Err(e)
            }
        }
    }

    /// Check if cancellation has been requested.
    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(PreprocessingError::Cancelled);
        }
        Ok(())
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn run_internal(&self) -> Result<PreprocessingOutcome> {
        let started_at = Utc::now();
        let start_time = Instant::now();

        info!("Starting preprocessing run...");
        self.report_progress(ProgressUpdate::new(
            PreprocessingStage::Initializing,
            0.0,
            "Starting preprocessing run...",
        ));
        self.check_cancelled()?;

        // Step 1: Load
        self.report_progress(ProgressUpdate::new(
            PreprocessingStage::Loading,
            0.0,
            format!("Reading {}", self.config.input_path.display()),
        ));
        let raw = load_dataset(&self.config.input_path)?;
        self.report_progress(ProgressUpdate::new(
            PreprocessingStage::Loading,
            1.0,
            format!("Loaded {} rows", raw.height()),
        ));

        // Steps 2-4: fit, transform, split
        let mut processed = self.process_stages(&raw)?;

        // Step 5: Write outputs
        self.check_cancelled()?;
        let outputs = OutputPaths::for_config(&self.config);
        self.write_outputs(&mut processed, &outputs)?;

        let mut summary = RunSummary {
            started_at,
            duration_ms: 0,
            input_path: self.config.input_path.clone(),
            rows_total: raw.height(),
            rows_train: processed.train.height(),
            rows_validation: processed.validation.height(),
            split_ratio: self.config.split_ratio,
            seed: self.config.seed,
            feature_count: processed.transformer.feature_columns().len(),
            feature_columns: processed.transformer.feature_columns().to_vec(),
            imputed: Default::default(),
            unencoded: Default::default(),
            outputs,
        };
        summary.record_stats(&processed.stats);
        summary.duration_ms = start_time.elapsed().as_millis() as u64;

        if let Some(report_path) = &summary.outputs.report {
            write_report(&summary, report_path)?;
        }

        info!(
            "Preprocessing run finished in {}ms: {} train rows, {} validation rows",
            summary.duration_ms, summary.rows_train, summary.rows_validation
        );

        Ok(PreprocessingOutcome {
            summary,
            split: processed.split,
        })
    }

    fn process_stages(&self, df: &DataFrame) -> Result<ProcessedDataset> {
        self.check_cancelled()?;

        // Fit on every row so the persisted state reproduces both subsets.
        self.report_progress(ProgressUpdate::new(
            PreprocessingStage::Fitting,
            0.0,
            "Fitting imputation and encoding...",
        ));
        let transformer = FeatureTransformer::fit(df, &self.config.schema)?;
        self.report_progress(ProgressUpdate::new(
            PreprocessingStage::Fitting,
            1.0,
            format!("Fitted {} feature columns", transformer.feature_columns().len()),
        ));

        self.check_cancelled()?;

        self.report_progress(ProgressUpdate::new(
            PreprocessingStage::Transforming,
            0.0,
            "Transforming features...",
        ));
        let (features, stats) = transformer.transform_with_stats(df)?;
        debug!(
            "Imputed {} values, {} unencodable categories",
            stats.total_imputed(),
            stats.total_unencoded()
        );
        self.report_progress(ProgressUpdate::new(
            PreprocessingStage::Transforming,
            1.0,
            format!("Imputed {} values", stats.total_imputed()),
        ));

        self.check_cancelled()?;

        self.report_progress(ProgressUpdate::new(
            PreprocessingStage::Splitting,
            0.0,
            "Splitting rows...",
        ));
        let split = split_indices(features.height(), self.config.split_ratio, self.config.seed)?;
        let train = split.train_frame(&features)?;
        let validation = split.validation_frame(&features)?;
        self.report_progress(ProgressUpdate::new(
            PreprocessingStage::Splitting,
            1.0,
            format!("{} train / {} validation rows", train.height(), validation.height()),
        ));

        Ok(ProcessedDataset {
            train,
            validation,
            transformer,
            split,
            stats,
        })
    }

    fn write_outputs(&self, processed: &mut ProcessedDataset, outputs: &OutputPaths) -> Result<()> {
        const TOTAL: usize = 3;
        let header = self.config.include_header;

        self.report_progress(ProgressUpdate::with_items(
            PreprocessingStage::Writing,
            "Output: train",
            0,
            TOTAL,
            format!("Writing {}", outputs.train.display()),
        ));
        write_csv(&mut processed.train, &outputs.train, header)?;

        self.report_progress(ProgressUpdate::with_items(
            PreprocessingStage::Writing,
            "Output: validation",
            1,
            TOTAL,
            format!("Writing {}", outputs.validation.display()),
        ));
        write_csv(&mut processed.validation, &outputs.validation, header)?;

        self.report_progress(ProgressUpdate::with_items(
            PreprocessingStage::Writing,
            "Output: transformer state",
            2,
            TOTAL,
            format!("Writing {}", outputs.state.display()),
        ));
        processed.transformer.save(&outputs.state)?;

        self.report_progress(ProgressUpdate::with_items(
            PreprocessingStage::Writing,
            "Output: transformer state",
            TOTAL,
            TOTAL,
            "All outputs written",
        ));
        Ok(())
    }
}

fn write_report(summary: &RunSummary, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context(format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(path, json).context(format!("Failed to write report {}", path.display()))?;
    info!("Report saved: {}", path.display());
    Ok(())
}

/// Builder for creating a [`Preprocessor`] instance.
///
/// Use [`Preprocessor::builder()`] to get started.
#[derive(Default)]
pub struct PreprocessorBuilder {
    config: Option<PreprocessorConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: Option<CancellationToken>,
}

static_assertions::assert_impl_all!(PreprocessorBuilder: Send);

impl PreprocessorBuilder {
    /// Set the run configuration. Defaults to [`PreprocessorConfig::default()`].
    pub fn config(mut self, config: PreprocessorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use maintenance_prep::{ProgressReporter, ProgressUpdate};
    /// use std::sync::Arc;
    ///
    /// struct StageLogger;
    ///
    /// impl ProgressReporter for StageLogger {
    ///     fn report(&self, update: ProgressUpdate) {
    ///         eprintln!("{}: {}", update.stage.display_name(), update.message);
    ///     }
    /// }
    ///
    /// let preprocessor = Preprocessor::builder()
    ///     .progress_reporter(Arc::new(StageLogger))
    ///     .build()?;
    /// ```
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// Shorthand for [`progress_reporter`](Self::progress_reporter) with a
    /// [`ClosureProgressReporter`].
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Set a cancellation token for stopping the run.
    ///
    /// The run checks the token between stages and returns
    /// [`PreprocessingError::Cancelled`] once it is set.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Build the preprocessor.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Preprocessor, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Preprocessor {
            config,
            progress_reporter: self.progress_reporter,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
        })
    }
}
