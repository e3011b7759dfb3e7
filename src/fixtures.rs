//! Movie metadata CSV fixtures shared by the unit tests.

use anyhow::Result;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

pub const COLUMNS: [&str; 24] = [
    "adult",
    "belongs_to_collection",
    "budget",
    "genres",
    "homepage",
    "id",
    "imdb_id",
    "original_language",
    "original_title",
    "overview",
    "popularity",
    "poster_path",
    "production_companies",
    "production_countries",
    "release_date",
    "revenue",
    "runtime",
    "spoken_languages",
    "status",
    "tagline",
    "title",
    "video",
    "vote_average",
    "vote_count",
];

pub const DRAMA: &str = "[{'id': 18, 'name': 'Drama'}]";
pub const DRAMA_COMEDY: &str = "[{'id': 18, 'name': 'Drama'}, {'id': 35, 'name': 'Comedy'}]";
pub const ANIMATION: &str = "[{'id': 16, 'name': 'Animation'}, {'id': 35, 'name': 'Comedy'}, {'id': 10751, 'name': 'Family'}]";
pub const ENGLISH: &str = "[{'iso_639_1': 'en', 'name': 'English'}]";

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn csv_line(fields: &[&str]) -> String {
    fields.iter().map(|f| quote(f)).collect::<Vec<_>>().join(",")
}

/// A well-formed 24-column movie row
pub fn movie(
    title: &str,
    release_date: &str,
    status: &str,
    vote_average: &str,
    vote_count: &str,
    genres: &str,
) -> String {
    csv_line(&[
        "False",
        "",
        "0",
        genres,
        "",
        "862",
        "tt0114709",
        "en",
        title,
        "An overview.",
        "21.946943",
        "/poster.jpg",
        "[{'name': 'Pixar Animation Studios', 'id': 3}]",
        "[{'iso_3166_1': 'US', 'name': 'United States of America'}]",
        release_date,
        "373554033.0",
        "81.0",
        ENGLISH,
        status,
        "A tagline",
        title,
        "False",
        vote_average,
        vote_count,
    ])
}

/// One logical movie split over two physical rows by a line break inside
/// `overview`: the second row starts with the rest of the overview and
/// carries every later field shifted to the left.
pub fn split_movie(
    title: &str,
    release_date: &str,
    vote_average: &str,
    vote_count: &str,
    spoken_languages: &str,
) -> [String; 2] {
    let (mut head, mut tail) =
        split_fields(title, release_date, vote_average, vote_count, spoken_languages);
    head.resize(COLUMNS.len(), "");
    tail.resize(COLUMNS.len(), "");
    [csv_line(&head), csv_line(&tail)]
}

/// Like [`split_movie`], but each physical row ends at its last field the
/// way the broken export wrote it: 10 fields in the first row, 15 in the second.
pub fn split_movie_ragged(
    title: &str,
    release_date: &str,
    vote_average: &str,
    vote_count: &str,
    spoken_languages: &str,
) -> [String; 2] {
    let (head, tail) = split_fields(title, release_date, vote_average, vote_count, spoken_languages);
    [csv_line(&head), csv_line(&tail)]
}

fn split_fields<'a>(
    title: &'a str,
    release_date: &'a str,
    vote_average: &'a str,
    vote_count: &'a str,
    spoken_languages: &'a str,
) -> (Vec<&'a str>, Vec<&'a str>) {
    let head = vec![
        "False",
        "",
        "0",
        DRAMA,
        "",
        "82663",
        "tt0113002",
        "en",
        title,
        "A story cut",
    ];
    let tail = vec![
        " in two.",
        "0.065736",
        "/split.jpg",
        "[{'name': 'Carousel Productions', 'id': 11176}]",
        "[{'iso_3166_1': 'CA', 'name': 'Canada'}]",
        release_date,
        "0",
        "104.0",
        spoken_languages,
        "Released",
        "Lost tagline",
        title,
        "False",
        vote_average,
        vote_count,
    ];
    (head, tail)
}

/// Write a movie CSV with the standard header into the temp directory
pub fn write_csv(name: &str, rows: &[String]) -> Result<PathBuf> {
    let path = std::env::temp_dir().join(name);
    let mut file = fs::File::create(&path)?;
    writeln!(file, "{}", COLUMNS.join(","))?;
    for row in rows {
        writeln!(file, "{}", row)?;
    }
    Ok(path)
}
