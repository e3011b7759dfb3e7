//! Repair of movie records that a stray line break split over two rows.
//!
//! A split record keeps its leading columns up to a truncated `overview`;
//! the following physical row starts with the rest of the overview and
//! carries every later field shifted to the left. The positions of these
//! records are known in advance and passed in, nothing here detects them.

use crate::literal::{self, LiteralError};
use polars::prelude::*;
use thiserror::Error;
use tracing::info;

const ROW_INDEX: &str = "__row_nr";

#[derive(Error, Debug)]
pub enum RepairError {
    #[error("column '{0}' is missing")]
    MissingColumn(String),

    #[error("column '{0}' precedes the split point")]
    ColumnOrder(String),

    #[error("row {row} has no successor (table has {height} rows)")]
    OutOfBounds { row: usize, height: usize },

    #[error("split records at rows {first} and {second} overlap")]
    OverlappingPairs { first: usize, second: usize },

    #[error("row {row}, column '{column}': cannot read '{value}' as a number")]
    Coercion {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row}, column '{column}': structured value is missing")]
    MissingLiteral { row: usize, column: String },

    #[error("row {row}, column '{column}': {source}")]
    Literal {
        row: usize,
        column: String,
        #[source]
        source: LiteralError,
    },

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// How a column of a split record is recovered from the following row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// Append the following row's text to the truncated value
    Append,
    Float,
    Text,
    /// Container literal, stored as canonical JSON text
    Literal,
    /// Cleared: the shifted value cannot be trusted
    Missing,
}

/// Columns rewritten for every split record. The first entry is the column
/// the line break fell into; the following row is shifted left by its
/// position.
pub const SPLIT_RECORD_SCHEMA: [(&str, FieldRule); 15] = [
    ("overview", FieldRule::Append),
    ("popularity", FieldRule::Float),
    ("poster_path", FieldRule::Text),
    ("production_companies", FieldRule::Text),
    ("production_countries", FieldRule::Text),
    ("release_date", FieldRule::Text),
    ("revenue", FieldRule::Float),
    ("runtime", FieldRule::Float),
    ("spoken_languages", FieldRule::Literal),
    ("status", FieldRule::Text),
    ("tagline", FieldRule::Missing),
    ("title", FieldRule::Text),
    ("video", FieldRule::Missing),
    ("vote_average", FieldRule::Float),
    ("vote_count", FieldRule::Float),
];

#[derive(Debug)]
struct Field {
    target: String,
    source: String,
    rule: FieldRule,
}

/// `SPLIT_RECORD_SCHEMA` resolved against the columns of a loaded table
#[derive(Debug)]
pub struct RepairPlan {
    fields: Vec<Field>,
}

impl RepairPlan {
    pub fn resolve(columns: &[String]) -> Result<Self, RepairError> {
        let position = |name: &str| {
            columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| RepairError::MissingColumn(name.to_string()))
        };

        let anchor = position(SPLIT_RECORD_SCHEMA[0].0)?;
        let mut fields = Vec::with_capacity(SPLIT_RECORD_SCHEMA.len());

        for (target, rule) in SPLIT_RECORD_SCHEMA {
            let source = position(target)?
                .checked_sub(anchor)
                .ok_or_else(|| RepairError::ColumnOrder(target.to_string()))?;
            fields.push(Field {
                target: target.to_string(),
                source: columns[source].clone(),
                rule,
            });
        }

        Ok(Self { fields })
    }

    /// Column of the following row that feeds `target`
    #[cfg(test)]
    pub fn source_of(&self, target: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.target == target)
            .map(|f| f.source.as_str())
    }

    fn float_columns(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.rule == FieldRule::Float)
            .map(|f| f.target.as_str())
    }
}

impl Field {
    /// Recovered value of this field for the split record at `row`
    fn recover(&self, df: &DataFrame, row: usize) -> Result<Option<String>, RepairError> {
        let next = cell(df, &self.source, row + 1)?;

        match self.rule {
            FieldRule::Append => {
                let head = cell(df, &self.target, row)?;
                Ok(match (head, next) {
                    (None, None) => None,
                    (head, next) => Some(format!(
                        "{}{}",
                        head.unwrap_or_default(),
                        next.unwrap_or_default()
                    )),
                })
            }
            FieldRule::Text => Ok(next.map(str::to_string)),
            FieldRule::Float => next
                .map(|text| {
                    text.trim()
                        .parse::<f64>()
                        .map(|v| v.to_string())
                        .map_err(|_| RepairError::Coercion {
                            row,
                            column: self.target.clone(),
                            value: text.to_string(),
                        })
                })
                .transpose(),
            FieldRule::Literal => {
                let text = next.ok_or_else(|| RepairError::MissingLiteral {
                    row,
                    column: self.target.clone(),
                })?;
                literal::canonicalize(text)
                    .map(Some)
                    .map_err(|source| RepairError::Literal {
                        row,
                        column: self.target.clone(),
                        source,
                    })
            }
            FieldRule::Missing => Ok(None),
        }
    }
}

fn cell<'a>(df: &'a DataFrame, column: &str, row: usize) -> Result<Option<&'a str>, RepairError> {
    Ok(df.column(column)?.str()?.get(row))
}

fn check_rows(bad_rows: &[usize], height: usize) -> Result<(), RepairError> {
    for (n, &row) in bad_rows.iter().enumerate() {
        if row >= height.saturating_sub(1) {
            return Err(RepairError::OutOfBounds { row, height });
        }
        for &first in &bad_rows[..n] {
            if first == row || first + 1 == row || row + 1 == first {
                return Err(RepairError::OverlappingPairs { first, second: row });
            }
        }
    }
    Ok(())
}

fn cell_literal(value: Option<String>) -> Expr {
    match value {
        Some(v) => lit(v),
        None => Null {}.lit().cast(DataType::String),
    }
}

/// Merge each split record at `bad_rows` with its following row, drop the
/// following rows and cast the numeric columns of the record schema to
/// `Float64`.
///
/// Every check runs before the table is rebuilt, so on error no table is
/// returned at all.
pub fn repair(df: DataFrame, bad_rows: &[usize]) -> Result<DataFrame, RepairError> {
    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|c| c.to_string())
        .collect();
    let plan = RepairPlan::resolve(&columns)?;
    check_rows(bad_rows, df.height())?;

    let mut patches: Vec<Vec<(usize, Option<String>)>> = vec![Vec::new(); plan.fields.len()];
    for &row in bad_rows {
        for (field, cells) in plan.fields.iter().zip(patches.iter_mut()) {
            cells.push((row, field.recover(&df, row)?));
        }
        info!(row, "merged split record");
    }

    let patched: Vec<Expr> = plan
        .fields
        .iter()
        .zip(patches)
        .map(|(field, cells)| {
            cells
                .into_iter()
                .fold(col(field.target.as_str()), |otherwise, (row, value)| {
                    when(col(ROW_INDEX).eq(lit(row as IdxSize)))
                        .then(cell_literal(value))
                        .otherwise(otherwise)
                })
                .alias(field.target.as_str())
        })
        .collect();

    let keep = bad_rows.iter().fold(lit(true), |keep, &row| {
        keep.and(col(ROW_INDEX).neq(lit((row + 1) as IdxSize)))
    });

    let floats: Vec<Expr> = plan
        .float_columns()
        .map(|c| col(c).cast(DataType::Float64))
        .collect();

    let original: Vec<Expr> = columns.iter().map(|c| col(c.as_str())).collect();

    let repaired = df
        .lazy()
        .with_row_index(ROW_INDEX, None)
        .with_columns(patched)
        .filter(keep)
        .with_columns(floats)
        .select(original)
        .collect()?;

    info!(records = bad_rows.len(), rows = repaired.height(), "split records repaired");
    Ok(repaired)
}
