//! CSV input and output.
//!
//! Input fields are read as text (no dtype inference) so that each column
//! is parsed by its declared role and bad values are reported precisely.

use crate::error::{Result, ResultExt};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;
use tracing::{debug, info};

/// Load a headered CSV file with every column as a string column.
pub fn load_dataset(path: &Path) -> Result<DataFrame> {
    fs::metadata(path).context(format!("Cannot read input {}", path.display()))?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .context(format!("Cannot open input {}", path.display()))?
        .finish()
        .context(format!("Cannot parse input {}", path.display()))?;

    info!(
        "Loaded {} rows and {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );
    Ok(df)
}

/// Write a DataFrame as CSV, creating the parent directory.
pub fn write_csv(df: &mut DataFrame, path: &Path, include_header: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context(format!("Cannot create {}", parent.display()))?;
    }

    let mut file = File::create(path).context(format!("Cannot create {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(include_header)
        .with_separator(b',')
        .finish(df)
        .context(format!("Cannot write {}", path.display()))?;

    debug!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}
