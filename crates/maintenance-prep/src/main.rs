//! CLI entry point for the maintenance feature preprocessor.

use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use maintenance_prep::dataset::load_dataset;
use maintenance_prep::{
    ColumnRole, OutputLayout, PreprocessingError, Preprocessor, PreprocessorConfig,
    ProcessedDataset, ResultExt, RunSummary,
};
use polars::prelude::DataFrame;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Predictive maintenance feature preprocessing",
    long_about = "Imputes, one-hot encodes and splits the raw machine failure dataset into \
                  train and validation feature sets, and saves the fitted transformer state.\n\n\
                  ENVIRONMENT VARIABLES (a .env file is read if present):\n  \
                  PREP_INPUT_PATH       Raw CSV input\n  \
                  PREP_TRAIN_DIR        Directory for train.csv\n  \
                  PREP_VALIDATION_DIR   Directory for validation.csv\n  \
                  PREP_MODEL_DIR        Directory for transformer_state.json\n\n\
                  EXAMPLES:\n  \
                  # Processing container defaults under /opt/ml/processing\n  \
                  maintenance-prep --train-test-split-ratio 0.2\n\n  \
                  # Local paths, preview only\n  \
                  maintenance-prep --train-test-split-ratio 0.2 -i raw.csv --dry-run"
)]
struct Args {
    /// Fraction of rows in the validation subset, in (0, 1)
    #[arg(long)]
    train_test_split_ratio: f64,

    /// Path to the raw CSV file
    #[arg(short, long, env = "PREP_INPUT_PATH")]
    input: Option<PathBuf>,

    /// Output directory for train.csv
    #[arg(long, env = "PREP_TRAIN_DIR")]
    train_dir: Option<PathBuf>,

    /// Output directory for validation.csv
    #[arg(long, env = "PREP_VALIDATION_DIR")]
    validation_dir: Option<PathBuf>,

    /// Output directory for the transformer state (and report)
    #[arg(long, env = "PREP_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    /// Seed for the train/validation shuffle
    #[arg(long)]
    seed: Option<u64>,

    /// JSON file with a full preprocessor configuration
    ///
    /// Command line flags override values from the file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write feature CSVs without a header row
    #[arg(long)]
    no_header: bool,

    /// Fit, transform and split in memory without writing outputs
    #[arg(long)]
    dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all logs; only the final JSON is written.
    #[arg(long)]
    json: bool,

    /// Write preprocessing_report.json next to the transformer state
    #[arg(short = 'r', long)]
    emit_report: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    // Before parsing, so .env values reach the `env` arguments.
    dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    let result = run(&args);

    if let Err(e) = &result {
        match e.downcast_ref::<PreprocessingError>() {
            Some(err) if args.json => println!("{}", serde_json::to_string_pretty(err)?),
            Some(err) => error!("Preprocessing failed [{}]: {}", err.error_code(), err),
            None => error!("Preprocessing failed: {:#}", e),
        }
    }
    result
}

fn run(args: &Args) -> Result<()> {
    let config = build_config(args)?;
    // `--json` reports only `PreprocessingError`s.
    let preprocessor = Preprocessor::builder()
        .config(config)
        .build()
        .map_err(PreprocessingError::from)?;

    if args.dry_run {
        return run_dry_run(&preprocessor, args);
    }

    let outcome = preprocessor.run()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.summary)?);
    } else {
        print_human_readable_summary(&outcome.summary);
    }
    Ok(())
}

/// Merge the optional JSON config file with command line overrides.
fn build_config(args: &Args) -> Result<PreprocessorConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .context(format!("Cannot read config {}", path.display()))?;
            serde_json::from_str(&text).map_err(|e| {
                PreprocessingError::from(e)
                    .with_context(format!("Invalid config {}", path.display()))
            })?
        }
        None => PreprocessorConfig::default(),
    };

    config.split_ratio = args.train_test_split_ratio;
    if let Some(input) = &args.input {
        config.input_path = input.clone();
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    apply_output_overrides(&mut config.outputs, args);
    if args.no_header {
        config.include_header = false;
    }
    if args.emit_report {
        config.emit_report = true;
    }

    info!(
        "Configuration: input={}, split_ratio={}, seed={}",
        config.input_path.display(),
        config.split_ratio,
        config.seed
    );
    Ok(config)
}

fn apply_output_overrides(outputs: &mut OutputLayout, args: &Args) {
    if let Some(dir) = &args.train_dir {
        outputs.train_dir = dir.clone();
    }
    if let Some(dir) = &args.validation_dir {
        outputs.validation_dir = dir.clone();
    }
    if let Some(dir) = &args.model_dir {
        outputs.model_dir = dir.clone();
    }
}

/// Preview the run without writing anything.
///
/// Uses `println!` for user-facing output, which is the point of --dry-run.
fn run_dry_run(preprocessor: &Preprocessor, args: &Args) -> Result<()> {
    let config = preprocessor.config();
    let raw = load_dataset(&config.input_path)?;
    let processed = preprocessor.process(&raw)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&dry_run_json(&raw, &processed))?);
        return Ok(());
    }

    println!("\n{}", "=".repeat(80));
    println!("DRY RUN - nothing is written");
    println!("{}\n", "=".repeat(80));

    println!("DATASET");
    println!("{}", "-".repeat(40));
    println!("  File: {}", config.input_path.display());
    println!("  Rows: {}", raw.height());
    println!("  Columns: {}", raw.width());
    println!();

    println!("COLUMNS");
    println!("{}", "-".repeat(40));
    println!("{:<28} {:<14} {:<10}", "Column", "Role", "Imputed");
    println!("{}", "-".repeat(54));
    for spec in &config.schema.columns {
        let role = match spec.role {
            ColumnRole::Identifier => "identifier",
            ColumnRole::Numeric => "numeric",
            ColumnRole::Categorical => "categorical",
            ColumnRole::Indicator { .. } => "indicator",
        };
        let imputed = processed.stats.imputed.get(&spec.name).copied().unwrap_or(0);
        println!("{:<28} {:<14} {:<10}", truncate_str(&spec.name, 27), role, imputed);
    }
    println!();

    println!("FEATURES ({})", processed.transformer.feature_columns().len());
    println!("{}", "-".repeat(40));
    println!("  {}", processed.transformer.feature_columns().join(", "));
    for (column, count) in &processed.stats.unencoded {
        println!("  ! {}: {} missing or unseen values encoded as all zeros", column, count);
    }
    println!();

    println!("SPLIT");
    println!("{}", "-".repeat(40));
    println!(
        "  {} train / {} validation (ratio {}, seed {})",
        processed.train.height(),
        processed.validation.height(),
        config.split_ratio,
        config.seed
    );
    println!("{}", "=".repeat(80));
    Ok(())
}

fn dry_run_json(raw: &DataFrame, processed: &ProcessedDataset) -> serde_json::Value {
    json!({
        "rows_total": raw.height(),
        "rows_train": processed.train.height(),
        "rows_validation": processed.validation.height(),
        "feature_columns": processed.transformer.feature_columns(),
        "imputed": processed.stats.imputed,
        "unencoded": processed.stats.unencoded,
    })
}

fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Print a human-readable summary of a finished run.
fn print_human_readable_summary(summary: &RunSummary) {
    println!();
    println!("{}", "=".repeat(80));
    println!("PREPROCESSING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!("Input:  {} ({} rows)", summary.input_path.display(), summary.rows_total);
    println!("Train:      {} ({} rows)", summary.outputs.train.display(), summary.rows_train);
    println!(
        "Validation: {} ({} rows)",
        summary.outputs.validation.display(),
        summary.rows_validation
    );
    println!("State:      {}", summary.outputs.state.display());
    if let Some(report) = &summary.outputs.report {
        println!("Report:     {}", report.display());
    }
    println!();

    println!("Processing Summary:");
    println!("  Duration: {}ms", summary.duration_ms);
    println!(
        "  Split: ratio {} (observed {:.3}), seed {}",
        summary.split_ratio,
        summary.validation_fraction(),
        summary.seed
    );
    println!("  Features: {}", summary.feature_count);
    println!("  Imputed values: {}", summary.total_imputed());
    for (column, count) in &summary.imputed {
        println!("    - {}: {}", column, count);
    }
    println!();

    if !summary.unencoded.is_empty() {
        println!("Warnings:");
        for (column, count) in &summary.unencoded {
            println!("  ! {}: {} missing or unseen categories encoded as all zeros", column, count);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("Use --emit-report to save the summary next to the transformer state");
    println!("{}", "=".repeat(80));
}
