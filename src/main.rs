use anyhow::{Context, Result};
use clap::Parser;
use polars::prelude::DataFrame;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

mod dataset;
mod export;
mod literal;
mod repair;
mod stats;

#[cfg(test)]
mod fixtures;

use export::ExportOutcome;
use stats::GenreErrors;

/// Rows of the reference movies_metadata.csv holding the first half of a
/// record that a line break split in two
const DEFAULT_BAD_ROWS: [usize; 3] = [19729, 29502, 35586];

#[derive(Parser, Debug, Clone)]
#[command(
    name = "movie-stats",
    about = "Repair and summarize a movie metadata table",
    long_about = "Loads a movie metadata CSV, merges records that a line break split over two rows,\n\
                  prints summary statistics and exports the cleaned table as a JSON array of records.",
    version = "0.0.0",
    after_help = "Examples:\n  \
      movie-stats                                           # data/movies_metadata.csv -> data/movies_metadata.json\n  \
      movie-stats -i movies.csv -o movies.json              # Other input and output paths\n  \
      movie-stats --bad-row 12,40 --bad-row 77              # Split records at other rows\n  \
      movie-stats --top 10 --min-votes 5000 --no-export     # Statistics only\n  \
      movie-stats --genre-errors abort                      # Fail on unparseable genres\n\n\
      Logging: set RUST_LOG (e.g. RUST_LOG=debug) to change verbosity; logs go to stderr."
)]
struct Cli {
    /// Delimited input file (.csv, .txt or .tsv)
    #[arg(short, long, value_name = "FILE", default_value = "data/movies_metadata.csv")]
    input: PathBuf,

    /// JSON output file, written only if it does not exist yet
    #[arg(short, long, value_name = "FILE", default_value = "data/movies_metadata.json")]
    output: PathBuf,

    /// Row of a split record (0-based, repeatable or comma-separated)
    #[arg(
        long = "bad-row",
        value_name = "ROW",
        value_delimiter = ',',
        default_values_t = DEFAULT_BAD_ROWS
    )]
    bad_rows: Vec<usize>,

    /// Number of movies in the top-rated list
    #[arg(long, default_value_t = 5)]
    top: usize,

    /// Top-rated movies need more votes than this
    #[arg(long, default_value_t = 9999.0)]
    min_votes: f64,

    /// Handling of unparseable genres cells
    #[arg(long, value_enum, default_value_t = GenreErrors::Skip)]
    genre_errors: GenreErrors,

    /// Skip writing the JSON file
    #[arg(long)]
    no_export: bool,
}

fn init_tracing() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run(&cli)
}

/// Load, repair, report and export. Any failing stage stops the pipeline.
fn run(cli: &Cli) -> Result<()> {
    let df = dataset::load(&cli.input)
        .with_context(|| format!("Failed to load dataset '{}'", cli.input.display()))?;
    println!("Dataset loaded: {}", cli.input.display());
    println!("Rows: {}\nColumns: {}", df.height(), df.width());

    let df = repair::repair(df, &cli.bad_rows).context("Failed pre-processing")?;
    println!("Data Pre-Processing completed");

    print_report(&df, cli)?;

    if cli.no_export {
        info!("export disabled");
        return Ok(());
    }

    let outcome = export::export(&df, &cli.output)
        .with_context(|| format!("Failed to export to '{}'", cli.output.display()))?;
    match outcome {
        ExportOutcome::Written => println!("Saved {} records to {}", df.height(), cli.output.display()),
        ExportOutcome::Skipped => println!("JSON file already exists: {}", cli.output.display()),
    }

    Ok(())
}

/// Already rounded to 2 decimals; whole values keep one decimal (`7.0`)
fn format_rating(average: Option<f64>) -> String {
    match average {
        Some(average) => format!("{:?}", average),
        None => "n/a".to_string(),
    }
}

/// Print every statistic to stdout
fn print_report(df: &DataFrame, cli: &Cli) -> Result<()> {
    let unique = stats::unique_movies(df).context("Failed to count unique movies")?;
    println!("Number of the unique movies: {}", unique);

    let average = stats::average_rating(df).context("Failed to average ratings")?;
    println!("Average rating of all the movies: {}", format_rating(average));

    let top = stats::top_rated(df, cli.top, cli.min_votes).context("Failed to rank movies")?;
    println!("Top {} highest rated movies:", cli.top);
    for title in &top {
        println!("{}", title);
    }

    let years = stats::releases_per_year(df).context("Failed to count releases per year")?;
    println!("Releases per year:");
    for (year, count) in &years {
        println!("{}: {}", year, count);
    }

    let genres =
        stats::movies_per_genre(df, cli.genre_errors).context("Failed to count movies per genre")?;
    println!("Movies per genre:");
    for (genre, count) in &genres.counts {
        println!("{}: {}", genre, count);
    }
    if !genres.skipped.is_empty() {
        println!("({} rows with malformed genres skipped)", genres.skipped.len());
    }

    Ok(())
}
