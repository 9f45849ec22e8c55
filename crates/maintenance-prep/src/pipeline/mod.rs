//! Pipeline module.
//!
//! This module provides the preprocessor run and its progress reporting.

mod builder;
pub mod progress;

pub use builder::{PreprocessingOutcome, ProcessedDataset, Preprocessor, PreprocessorBuilder};
pub use progress::{
    CancellationToken, ClosureProgressReporter, PreprocessingStage, ProgressReporter,
    ProgressUpdate,
};
