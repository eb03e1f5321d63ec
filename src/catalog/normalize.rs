//! Movie payload normalization
//!
//! Clients send movies either in the catalog's own lowercase shape or copied
//! straight from an OMDb-style source with Title-Case keys and comma separated
//! strings. [`normalize_movie`] reconciles both into a [`MoviePatch`] holding
//! only the fields the payload actually supplied.

use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};
use crate::models::{MoviePatch, MovieType, Rated, Rating};
use crate::parser::{
    parse_leading_float, parse_leading_integer, parse_runtime, parse_votes, split_list,
};

/// Maximum title length in characters
pub const TITLE_MAX_CHARS: usize = 200;

/// Maximum plot length in characters
pub const PLOT_MAX_CHARS: usize = 2000;

/// Key under which some clients nest the movie object
const NESTED_KEY: &str = "movieData";

/// A value counts as supplied unless it is null or an empty string
fn is_supplied(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

/// First supplied value among `keys`, in order
fn pick<'a, 'k>(
    object: &'a Map<String, Value>,
    keys: &[&'k str],
) -> Option<(&'k str, &'a Value)> {
    keys.iter().find_map(|&key| {
        object
            .get(key)
            .filter(|value| is_supplied(value))
            .map(|value| (key, value))
    })
}

fn invalid(field: &str, expected: &str) -> AppError {
    AppError::validation(format!("`{}` must be {}", field, expected))
}

fn text(object: &Map<String, Value>, keys: &[&str]) -> AppResult<Option<String>> {
    match pick(object, keys) {
        None => Ok(None),
        Some((_, Value::String(s))) => Ok(Some(s.trim().to_string())),
        Some((_, Value::Number(n))) => Ok(Some(n.to_string())),
        Some((key, _)) => Err(invalid(key, "a string")),
    }
}

fn list(object: &Map<String, Value>, keys: &[&str]) -> AppResult<Option<Vec<String>>> {
    match pick(object, keys) {
        None => Ok(None),
        Some((_, Value::String(s))) => Ok(Some(split_list(s))),
        Some((key, Value::Array(items))) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.trim().to_string()),
                _ => Err(invalid(key, "a list of strings")),
            })
            .filter(|item| !matches!(item, Ok(s) if s.is_empty()))
            .collect::<AppResult<Vec<_>>>()
            .map(Some),
        Some((key, _)) => Err(invalid(key, "a string or a list of strings")),
    }
}

fn integer(
    object: &Map<String, Value>,
    keys: &[&str],
    from_text: fn(&str) -> Option<i64>,
) -> AppResult<Option<i64>> {
    match pick(object, keys) {
        None => Ok(None),
        Some((_, Value::Number(n))) => Ok(n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))),
        Some((_, Value::String(s))) => Ok(from_text(s)),
        Some((key, _)) => Err(invalid(key, "a number")),
    }
}

fn float(object: &Map<String, Value>, keys: &[&str]) -> AppResult<Option<f64>> {
    match pick(object, keys) {
        None => Ok(None),
        Some((_, Value::Number(n))) => Ok(n.as_f64()),
        Some((_, Value::String(s))) => Ok(Some(parse_leading_float(s).unwrap_or(0.0))),
        Some((key, _)) => Err(invalid(key, "a number")),
    }
}

fn check_length(field: &str, value: Option<&String>, max: usize) -> AppResult<()> {
    match value {
        Some(value) if value.chars().count() > max => Err(AppError::validation(format!(
            "{} cannot exceed {} characters",
            field, max
        ))),
        _ => Ok(()),
    }
}

/// Normalize a movie payload into the canonical field set
///
/// Title-Case keys take precedence over their lowercase twins. The payload
/// may be the movie itself or an object with the movie under `movieData`.
/// Creation fills unset fields with defaults via [`MoviePatch::into_movie`];
/// updates apply only what is set.
///
/// # Errors
/// Returns [`AppError::Validation`] for a non-object payload, a field of the
/// wrong JSON type, an unknown `rated` or `type` value, or an over-long title
/// or plot.
pub fn normalize_movie(payload: &Value) -> AppResult<MoviePatch> {
    let outer = payload
        .as_object()
        .ok_or_else(|| AppError::validation("Movie payload must be a JSON object"))?;
    let object = match outer.get(NESTED_KEY) {
        Some(Value::Object(nested)) => nested,
        _ => outer,
    };

    let rated = text(object, &["Rated", "rated"])?
        .map(|raw| raw.parse::<Rated>())
        .transpose()
        .map_err(AppError::validation)?;

    let movie_type = text(object, &["Type", "type"])?
        .map(|raw| raw.parse::<MovieType>())
        .transpose()
        .map_err(AppError::validation)?;

    let ratings = match pick(object, &["Ratings", "ratings"]) {
        None => None,
        Some((key, value)) => Some(
            serde_json::from_value::<Vec<Rating>>(value.clone())
                .map_err(|_| invalid(key, "a list of { Source, Value } pairs"))?,
        ),
    };

    let is_active = match pick(object, &["isActive"]) {
        None => None,
        Some((_, Value::Bool(active))) => Some(*active),
        Some((key, _)) => return Err(invalid(key, "a boolean")),
    };

    let patch = MoviePatch {
        title: text(object, &["Title", "title"])?,
        year: text(object, &["Year", "year"])?,
        rated,
        released: text(object, &["Released", "released"])?,
        runtime: integer(object, &["Runtime", "runtime"], |s| Some(parse_runtime(s)))?,
        genre: list(object, &["Genre", "genre"])?,
        director: text(object, &["Director", "director"])?,
        writer: list(object, &["Writer", "writer"])?,
        actors: list(object, &["Actors", "actors"])?,
        plot: text(object, &["Plot", "plot"])?,
        language: list(object, &["Language", "language"])?,
        country: list(object, &["Country", "country"])?,
        awards: text(object, &["Awards", "awards"])?,
        poster: text(object, &["Poster", "poster"])?,
        ratings,
        metascore: text(object, &["Metascore", "metascore"])?,
        imdb_rating: float(object, &["imdbRating"])?,
        imdb_votes: integer(object, &["imdbVotes"], |s| Some(parse_votes(s)))?,
        imdb_id: text(object, &["imdbID", "imdbId"])?,
        movie_type,
        total_seasons: integer(object, &["totalSeasons"], parse_leading_integer)?,
        dvd: text(object, &["DVD", "dvd"])?,
        box_office: text(object, &["BoxOffice", "boxOffice"])?,
        production: text(object, &["Production", "production"])?,
        website: text(object, &["Website", "website"])?,
        is_active,
    };

    check_length("Title", patch.title.as_ref(), TITLE_MAX_CHARS)?;
    check_length("Plot", patch.plot.as_ref(), PLOT_MAX_CHARS)?;

    Ok(patch)
}
