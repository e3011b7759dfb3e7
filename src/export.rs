//! Record-oriented JSON export of the repaired table.

use polars::prelude::*;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    Written,
    /// The destination already existed and was left untouched
    Skipped,
}

/// Write the table as a JSON array of records, one object per row.
///
/// The destination is created with create-new semantics: an existing file is
/// never truncated or overwritten.
pub fn export(df: &DataFrame, path: &Path) -> Result<ExportOutcome, ExportError> {
    let mut file = match File::create_new(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            warn!(path = %path.display(), "export target already exists, leaving it untouched");
            return Ok(ExportOutcome::Skipped);
        }
        Err(source) => {
            return Err(ExportError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    // The writer only walks the first chunk of each column
    let mut out = df.clone();
    out.as_single_chunk();
    let written = JsonWriter::new(&mut file)
        .with_json_format(JsonFormat::Json)
        .finish(&mut out);

    if let Err(e) = written {
        // Don't leave a truncated file behind: it would block the next export
        drop(file);
        fs::remove_file(path).ok();
        return Err(e.into());
    }

    info!(path = %path.display(), records = df.height(), "exported");
    Ok(ExportOutcome::Written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::{Value, json};

    fn sample() -> Result<DataFrame> {
        Ok(df!(
            "original_title" => ["Toy Story", "Jumanji"],
            "vote_average" => [Some(7.7), None],
            "tagline" => [None, Some("Roll the dice")]
        )?)
    }

    #[test]
    fn test_export_records() -> Result<()> {
        let path = std::env::temp_dir().join("export_records.json");
        fs::remove_file(&path).ok();

        let outcome = export(&sample()?, &path)?;
        assert_eq!(outcome, ExportOutcome::Written);

        let records: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(
            records,
            json!([
                {"original_title": "Toy Story", "vote_average": 7.7, "tagline": null},
                {"original_title": "Jumanji", "vote_average": null, "tagline": "Roll the dice"}
            ])
        );

        fs::remove_file(path)?;
        Ok(())
    }

    #[test]
    fn test_export_multi_chunk_frame() -> Result<()> {
        let path = std::env::temp_dir().join("export_multi_chunk.json");
        fs::remove_file(&path).ok();

        let mut df = sample()?;
        df.vstack_mut(&df!(
            "original_title" => ["Heat"],
            "vote_average" => [Some(7.7)],
            "tagline" => [Some("A Los Angeles crime saga")]
        )?)?;
        assert!(df.first_col_n_chunks() > 1);

        assert_eq!(export(&df, &path)?, ExportOutcome::Written);
        let records: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        let titles: Vec<_> = records
            .as_array()
            .map(|rows| rows.iter().map(|r| r["original_title"].clone()).collect())
            .unwrap_or_default();
        assert_eq!(titles, [json!("Toy Story"), json!("Jumanji"), json!("Heat")]);

        fs::remove_file(path)?;
        Ok(())
    }

    #[test]
    fn test_export_never_overwrites() -> Result<()> {
        let path = std::env::temp_dir().join("export_twice.json");
        fs::remove_file(&path).ok();

        assert_eq!(export(&sample()?, &path)?, ExportOutcome::Written);
        let content = fs::read(&path)?;
        let modified = fs::metadata(&path)?.modified()?;

        let other = df!("original_title" => ["Heat"])?;
        assert_eq!(export(&other, &path)?, ExportOutcome::Skipped);
        assert_eq!(fs::read(&path)?, content);
        assert_eq!(fs::metadata(&path)?.modified()?, modified);

        fs::remove_file(path)?;
        Ok(())
    }

    #[test]
    fn test_export_existing_empty_file_is_kept() -> Result<()> {
        let path = std::env::temp_dir().join("export_existing_empty.json");
        fs::write(&path, "")?;

        assert_eq!(export(&sample()?, &path)?, ExportOutcome::Skipped);
        assert_eq!(fs::read_to_string(&path)?, "");

        fs::remove_file(path)?;
        Ok(())
    }

    #[test]
    fn test_export_missing_directory() -> Result<()> {
        let path = std::env::temp_dir()
            .join("export_no_such_dir")
            .join("movies.json");

        let result = export(&sample()?, &path);
        assert!(matches!(result, Err(ExportError::Io { .. })));
        Ok(())
    }
}
