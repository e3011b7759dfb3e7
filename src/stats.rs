//! Read-only statistics over the repaired movie table.

use crate::literal::{self, LiteralError};
use clap::ValueEnum;
use polars::prelude::*;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

pub const ORIGINAL_TITLE: &str = "original_title";
pub const RELEASE_DATE: &str = "release_date";
pub const STATUS: &str = "status";
pub const VOTE_AVERAGE: &str = "vote_average";
pub const VOTE_COUNT: &str = "vote_count";
pub const GENRES: &str = "genres";

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("row {row}: malformed genres: {reason}")]
    MalformedGenres { row: usize, reason: String },

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// What to do with a `genres` cell that is not a list of named objects
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenreErrors {
    /// Log the row and leave it out of the counts
    Skip,
    /// Stop with an error
    Abort,
}

/// Occurrences per genre name, ordered by name
#[derive(Debug, Default, PartialEq)]
pub struct GenreTally {
    pub counts: BTreeMap<String, u32>,
    /// Rows left out because their `genres` cell was malformed
    pub skipped: Vec<usize>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Number of distinct (original_title, release_date) pairs.
/// Pairs with a missing member are not counted.
pub fn unique_movies(df: &DataFrame) -> PolarsResult<usize> {
    let counted = df
        .clone()
        .lazy()
        .select([col(ORIGINAL_TITLE), col(RELEASE_DATE)])
        .filter(col(ORIGINAL_TITLE).is_not_null().and(col(RELEASE_DATE).is_not_null()))
        .unique_stable(None, UniqueKeepStrategy::First)
        .select([len()])
        .collect()?;

    Ok(counted.column("len")?.u32()?.get(0).unwrap_or(0) as usize)
}

/// Mean of `vote_average` over rows that have one, rounded to 2 decimals
pub fn average_rating(df: &DataFrame) -> PolarsResult<Option<f64>> {
    let mean = df
        .clone()
        .lazy()
        .select([col(VOTE_AVERAGE).cast(DataType::Float64).mean()])
        .collect()?;

    Ok(mean.column(VOTE_AVERAGE)?.f64()?.get(0).map(round2))
}

/// Titles of the `n` best rated movies with more than `min_votes` votes,
/// best first. Equal ratings keep table order.
pub fn top_rated(df: &DataFrame, n: usize, min_votes: f64) -> PolarsResult<Vec<String>> {
    let top = df
        .clone()
        .lazy()
        .with_columns([
            col(VOTE_AVERAGE).cast(DataType::Float64),
            col(VOTE_COUNT).cast(DataType::Float64),
        ])
        .filter(
            col(VOTE_COUNT)
                .gt(lit(min_votes))
                .and(col(VOTE_AVERAGE).is_not_null()),
        )
        .sort_by_exprs(
            vec![col(VOTE_AVERAGE)],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_maintain_order(true),
        )
        .limit(IdxSize::try_from(n).unwrap_or(IdxSize::MAX))
        .select([col(ORIGINAL_TITLE)])
        .collect()?;

    Ok(top
        .column(ORIGINAL_TITLE)?
        .str()?
        .into_iter()
        .map(|title| title.unwrap_or_default().to_string())
        .collect())
}

/// Released movies per year (first four characters of `release_date`),
/// ascending by year
pub fn releases_per_year(df: &DataFrame) -> PolarsResult<Vec<(String, u32)>> {
    let years = df
        .clone()
        .lazy()
        .filter(
            col(STATUS)
                .eq(lit("Released"))
                .and(col(RELEASE_DATE).is_not_null()),
        )
        .select([col(RELEASE_DATE).str().slice(lit(0i64), lit(4u64)).alias("year")])
        .group_by([col("year")])
        .agg([len().alias("count")])
        .sort_by_exprs(vec![col("year")], SortMultipleOptions::default())
        .collect()?;

    let year = years.column("year")?.str()?;
    let count = years.column("count")?.u32()?;

    Ok(year
        .into_iter()
        .zip(count.into_iter())
        .filter_map(|(year, count)| Some((year?.to_string(), count?)))
        .collect())
}

/// Names of the genres in one `genres` cell
fn genre_names(text: &str) -> Result<Vec<String>, String> {
    let value = literal::parse(text).map_err(|e: LiteralError| e.to_string())?;
    let Value::Array(items) = value else {
        return Err("not a list".to_string());
    };

    items
        .iter()
        .map(|item| {
            item.get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| format!("entry without a name: {}", item))
        })
        .collect()
}

/// Count how many movies carry each genre. A missing cell contributes
/// nothing; malformed cells are handled according to `on_error`.
pub fn movies_per_genre(df: &DataFrame, on_error: GenreErrors) -> Result<GenreTally, StatsError> {
    let mut tally = GenreTally::default();

    for (row, cell) in df.column(GENRES)?.str()?.into_iter().enumerate() {
        let Some(text) = cell else { continue };

        match genre_names(text) {
            Ok(names) => {
                for name in names {
                    *tally.counts.entry(name).or_insert(0) += 1;
                }
            }
            Err(reason) => match on_error {
                GenreErrors::Skip => {
                    warn!(row, %reason, "skipping malformed genres");
                    tally.skipped.push(row);
                }
                GenreErrors::Abort => return Err(StatsError::MalformedGenres { row, reason }),
            },
        }
    }

    Ok(tally)
}
