//! Dashboard aggregation for a single user's catalog
//!
//! [`compute_dashboard`] loads the caller's movies once and [`aggregate`]
//! derives every statistic from that one snapshot, so the figures in a single
//! response always agree with each other.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use crate::db::MovieStore;
use crate::error::AppResult;
use crate::models::{Movie, MovieType};
use crate::parser::{leading_year, parse_awards, parse_box_office, year_bucket};

pub use crate::parser::AwardTotals;

/// Languages shown in the language distribution
const LANGUAGE_LIMIT: usize = 10;

/// Rating buckets as `(lower bound inclusive, upper bound exclusive, label)`
const RATING_BUCKETS: [(f64, f64, &str); 4] = [
    (0.0, 7.0, "< 7"),
    (7.0, 8.0, "7.0–7.9"),
    (8.0, 9.0, "8.0–8.9"),
    (9.0, 10.1, "9.0+"),
];

/// Label for ratings outside every bucket
const UNKNOWN_BUCKET: &str = "Unknown";

/// A labelled count in a distribution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct NamedCount {
    pub name: String,
    pub value: u64,
}

/// Titles released in one year
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct TimelinePoint {
    /// Year bucket, the first four characters of the `year` field
    pub name: String,
    pub views: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RatedTitle {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub poster: Option<String>,
    pub imdb_rating: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VotedTitle {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub poster: Option<String>,
    pub imdb_votes: i64,
}

/// Title with the largest box office
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct BoxOfficeTitle {
    pub title: String,
    /// Box office exactly as stored, e.g. `"$292,587,330"`
    pub value: String,
    pub poster: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct PopularGenre {
    pub name: String,
    pub count: u64,
}

/// Response for `GET /api/dashboard`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub found: bool,
    pub total_titles: u64,
    pub movies_count: u64,
    pub series_count: u64,
    /// Mean IMDb rating rounded to one decimal, 0 without titles
    pub avg_rating: f64,
    pub total_votes: i64,
    pub highest_rated: Option<RatedTitle>,
    pub most_voted: Option<VotedTitle>,
    /// Title with the latest leading year
    pub newest_release: Option<Movie>,
    /// Title with the earliest leading year
    pub oldest_release: Option<Movie>,
    pub highest_box_office: Option<BoxOfficeTitle>,
    pub total_awards: AwardTotals,
    pub most_popular_genre: Option<PopularGenre>,
    pub genre_distribution: Vec<NamedCount>,
    /// Ten most common languages
    pub language_distribution: Vec<NamedCount>,
    pub rating_distribution: Vec<NamedCount>,
    pub views_over_time: Vec<TimelinePoint>,
}

/// Load a user's movies and aggregate them
pub async fn compute_dashboard(store: &dyn MovieStore, user_id: &str) -> AppResult<DashboardStats> {
    let movies = store.movies_by_owner(user_id).await?;
    debug!("Aggregating dashboard over {} movies for {}", movies.len(), user_id);
    Ok(aggregate(&movies))
}

/// Aggregate dashboard statistics over one user's movies
pub fn aggregate(movies: &[Movie]) -> DashboardStats {
    let genre_distribution = distribution(movies.iter().flat_map(|m| m.genre.iter()));
    let mut language_distribution = distribution(movies.iter().flat_map(|m| m.language.iter()));
    language_distribution.truncate(LANGUAGE_LIMIT);

    let most_popular_genre = genre_distribution.first().map(|top| PopularGenre {
        name: top.name.clone(),
        count: top.value,
    });

    let mut total_awards = AwardTotals::default();
    for movie in movies {
        total_awards += parse_awards(movie.awards.as_deref());
    }

    DashboardStats {
        found: true,
        total_titles: movies.len() as u64,
        movies_count: count_type(movies, MovieType::Movie),
        series_count: count_type(movies, MovieType::Series),
        avg_rating: average_rating(movies),
        total_votes: movies.iter().map(|m| m.imdb_votes).fold(0, i64::saturating_add),
        highest_rated: first_extreme(movies, |m| Some(m.imdb_rating), greater).map(|m| {
            RatedTitle {
                id: m.id.clone(),
                title: m.title.clone(),
                poster: m.poster.clone(),
                imdb_rating: m.imdb_rating,
            }
        }),
        most_voted: first_extreme(movies, |m| Some(m.imdb_votes), greater).map(|m| VotedTitle {
            id: m.id.clone(),
            title: m.title.clone(),
            poster: m.poster.clone(),
            imdb_votes: m.imdb_votes,
        }),
        newest_release: first_extreme(movies, |m| leading_year(m.year.as_deref()), greater)
            .cloned(),
        oldest_release: first_extreme(movies, |m| leading_year(m.year.as_deref()), less).cloned(),
        highest_box_office: highest_box_office(movies),
        total_awards,
        most_popular_genre,
        genre_distribution,
        language_distribution,
        rating_distribution: rating_distribution(movies),
        views_over_time: timeline(movies),
    }
}

fn greater<K: PartialOrd>(candidate: &K, current: &K) -> bool {
    candidate.partial_cmp(current) == Some(Ordering::Greater)
}

fn less<K: PartialOrd>(candidate: &K, current: &K) -> bool {
    candidate.partial_cmp(current) == Some(Ordering::Less)
}

/// First movie whose key beats every earlier key; movies without a key are skipped
///
/// Ties keep the earliest movie, unlike `Iterator::max_by` which keeps the last.
fn first_extreme<K, F, B>(movies: &[Movie], key: F, beats: B) -> Option<&Movie>
where
    F: Fn(&Movie) -> Option<K>,
    B: Fn(&K, &K) -> bool,
{
    let mut best: Option<(&Movie, K)> = None;
    for movie in movies {
        let Some(candidate) = key(movie) else {
            continue;
        };
        let replace = match &best {
            Some((_, current)) => beats(&candidate, current),
            None => true,
        };
        if replace {
            best = Some((movie, candidate));
        }
    }
    best.map(|(movie, _)| movie)
}

fn count_type(movies: &[Movie], movie_type: MovieType) -> u64 {
    movies.iter().filter(|m| m.movie_type == movie_type).count() as u64
}

fn average_rating(movies: &[Movie]) -> f64 {
    if movies.is_empty() {
        return 0.0;
    }
    let mean = movies.iter().map(|m| m.imdb_rating).sum::<f64>() / movies.len() as f64;
    (mean * 10.0).round() / 10.0
}

/// Count occurrences, most common first, ties by name
fn distribution<'a>(values: impl Iterator<Item = &'a String>) -> Vec<NamedCount> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for value in values {
        *counts.entry(value.as_str()).or_default() += 1;
    }

    let mut distribution: Vec<NamedCount> = counts
        .into_iter()
        .map(|(name, value)| NamedCount {
            name: name.to_string(),
            value,
        })
        .collect();
    distribution.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.name.cmp(&b.name)));
    distribution
}

fn rating_bucket(rating: f64) -> &'static str {
    RATING_BUCKETS
        .iter()
        .find(|(low, high, _)| rating >= *low && rating < *high)
        .map(|(_, _, label)| *label)
        .unwrap_or(UNKNOWN_BUCKET)
}

/// Non-empty rating buckets in ascending order, `Unknown` last
fn rating_distribution(movies: &[Movie]) -> Vec<NamedCount> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for movie in movies {
        *counts.entry(rating_bucket(movie.imdb_rating)).or_default() += 1;
    }

    RATING_BUCKETS
        .iter()
        .map(|(_, _, label)| *label)
        .chain(std::iter::once(UNKNOWN_BUCKET))
        .filter_map(|label| {
            counts.get(label).map(|&value| NamedCount {
                name: label.to_string(),
                value,
            })
        })
        .collect()
}

/// Titles per year bucket, ascending
fn timeline(movies: &[Movie]) -> Vec<TimelinePoint> {
    let mut years: BTreeMap<String, u64> = BTreeMap::new();
    for bucket in movies.iter().filter_map(|m| year_bucket(m.year.as_deref())) {
        *years.entry(bucket).or_default() += 1;
    }

    years
        .into_iter()
        .map(|(name, views)| TimelinePoint { name, views })
        .collect()
}

fn highest_box_office(movies: &[Movie]) -> Option<BoxOfficeTitle> {
    let movie = first_extreme(
        movies,
        |m| parse_box_office(m.box_office.as_deref()),
        greater,
    )?;

    Some(BoxOfficeTitle {
        title: movie.title.clone(),
        value: movie.box_office.clone().unwrap_or_default(),
        poster: movie.poster.clone(),
    })
}
