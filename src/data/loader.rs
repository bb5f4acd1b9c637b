//! Record-set loading from a directory of CSV files

use crate::error::{FairtuneError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

use super::required_columns;

/// Load every CSV file in `dir` into a single record set.
///
/// All files must share one schema; rows are concatenated in lexicographic
/// file order. Every column is read as a string — the schema is entirely
/// categorical and downstream filtering compares raw values.
pub fn load_directory(dir: &Path) -> Result<DataFrame> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("csv"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(FairtuneError::DataError(format!(
            "no CSV files found in {}",
            dir.display()
        )));
    }

    let mut combined: Option<DataFrame> = None;
    for path in &paths {
        let df = read_csv(path)?;
        combined = Some(match combined {
            Some(acc) => acc.vstack(&df)?,
            None => df,
        });
    }

    let records = combined.expect("at least one CSV file was read");
    validate_schema(&records)?;

    tracing::info!(
        files = paths.len(),
        records = records.height(),
        "loaded surveillance record set"
    );

    Ok(records)
}

fn read_csv(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)
        .map_err(|e| FairtuneError::DataError(format!("{}: {}", path.display(), e)))?;

    // infer_schema_length of zero keeps every column as a string
    let reader = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(file);

    reader
        .finish()
        .map_err(|e| FairtuneError::DataError(format!("{}: {}", path.display(), e)))
}

/// Check that every required column is present in the record set.
pub fn validate_schema(records: &DataFrame) -> Result<()> {
    let present: Vec<String> = records
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    let missing: Vec<String> = required_columns()
        .into_iter()
        .filter(|c| !present.iter().any(|p| p == c))
        .map(|c| c.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(FairtuneError::MissingColumns { columns: missing })
    }
}
