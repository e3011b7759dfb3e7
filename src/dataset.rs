//! Loading the movie metadata table.

use polars::prelude::*;
use polars_utils::plpath::PlPath;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported file format: .{0}")]
    UnsupportedFormat(String),

    #[error("no data loaded from {0}")]
    NoData(PathBuf),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// Separator for a delimited file, detected by extension
fn separator_for(path: &Path) -> Result<u8, LoadError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    match extension {
        "csv" | "txt" => Ok(b','),
        "tsv" => Ok(b'\t'),
        ext => Err(LoadError::UnsupportedFormat(ext.to_string())),
    }
}

/// Polars wraps scan errors in context layers
fn is_no_data(err: &PolarsError) -> bool {
    match err {
        PolarsError::NoData(_) => true,
        PolarsError::Context { error, .. } => is_no_data(error),
        _ => false,
    }
}

/// Read a delimited file into a DataFrame.
///
/// Every column is read as text: the split records put overview fragments
/// into numeric columns, so inference would either fail or pick the wrong
/// type. Typed columns are produced after repair.
pub fn load(path: &Path) -> Result<DataFrame, LoadError> {
    let separator = separator_for(path)?;

    // Surface a missing or unreadable file as an I/O error rather than a
    // polars error
    std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let df = LazyCsvReader::new(PlPath::new(&path.to_string_lossy()))
        .with_separator(separator)
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .finish()
        .and_then(|lf| lf.collect());

    let df = match df {
        Ok(df) => df,
        Err(e) if is_no_data(&e) => return Err(LoadError::NoData(path.to_path_buf())),
        Err(e) => return Err(e.into()),
    };

    if df.height() == 0 {
        return Err(LoadError::NoData(path.to_path_buf()));
    }

    info!(path = %path.display(), rows = df.height(), columns = df.width(), "dataset loaded");
    Ok(df)
}
