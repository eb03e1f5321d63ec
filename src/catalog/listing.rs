//! Movie listing pipeline
//!
//! Every listing request works from the full movie snapshot held in the
//! cache under [`MOVIES_CACHE_KEY`]. Search, sort and pagination run in
//! memory, so the cached value never depends on query parameters.

use std::cmp::Ordering;
use std::time::Duration;

use serde::Deserialize;
use utoipa::IntoParams;

use crate::cache::{get_or_set, CacheStore};
use crate::db::MovieStore;
use crate::error::{AppError, AppResult};
use crate::models::{Movie, Pagination};
use crate::parser::{leading_year, parse_release_date};

/// Cache key of the full movie snapshot
pub const MOVIES_CACHE_KEY: &str = "movies_full_list";

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

const INVALID_PAGINATION: &str = "Page and limit must be positive numbers";

/// Listing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Leading year, newest first
    Latest,
    /// Leading year, oldest first
    Oldest,
    RatingDesc,
    RatingAsc,
    TitleAsc,
    TitleDesc,
    /// Release date, most recent first
    #[default]
    Released,
}

impl SortOrder {
    /// Parse a `sort` parameter; anything unrecognized orders by release date
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("latest") => SortOrder::Latest,
            Some("oldest") => SortOrder::Oldest,
            Some("rating_desc") => SortOrder::RatingDesc,
            Some("rating_asc") => SortOrder::RatingAsc,
            Some("title_asc") => SortOrder::TitleAsc,
            Some("title_desc") => SortOrder::TitleDesc,
            _ => SortOrder::Released,
        }
    }

    /// Compare two movies under this order
    pub fn compare(&self, a: &Movie, b: &Movie) -> Ordering {
        match self {
            SortOrder::Latest => year_key(b).cmp(&year_key(a)),
            SortOrder::Oldest => year_key(a).cmp(&year_key(b)),
            SortOrder::RatingDesc => b.imdb_rating.total_cmp(&a.imdb_rating),
            SortOrder::RatingAsc => a.imdb_rating.total_cmp(&b.imdb_rating),
            SortOrder::TitleAsc => a.title.cmp(&b.title),
            SortOrder::TitleDesc => b.title.cmp(&a.title),
            SortOrder::Released => released_key(b).cmp(&released_key(a)),
        }
    }
}

/// Unparsable years sort as year 0
fn year_key(movie: &Movie) -> i64 {
    leading_year(movie.year.as_deref()).unwrap_or(0)
}

/// Unparsable release dates sort as the Unix epoch
fn released_key(movie: &Movie) -> chrono::NaiveDate {
    parse_release_date(movie.released.as_deref()).unwrap_or_default()
}

/// Raw query string of `GET /api/movies`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// 1-based page number (default 1)
    pub page: Option<String>,
    /// Page size (default 10)
    pub limit: Option<String>,
    /// Case-insensitive substring matched against title, plot and director
    pub search: Option<String>,
    /// latest, oldest, rating_desc, rating_asc, title_asc or title_desc
    pub sort: Option<String>,
}

/// Validated listing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u64,
    pub limit: u64,
    pub search: String,
    pub sort: SortOrder,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            search: String::new(),
            sort: SortOrder::default(),
        }
    }
}

fn positive(raw: Option<&str>, default: u64) -> AppResult<u64> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value
            .parse::<u64>()
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| AppError::validation(INVALID_PAGINATION)),
    }
}

impl ListQuery {
    /// Validate query parameters
    ///
    /// # Errors
    /// [`AppError::Validation`] when `page` or `limit` is not a positive integer.
    pub fn from_params(params: &ListParams) -> AppResult<Self> {
        Ok(Self {
            page: positive(params.page.as_deref(), DEFAULT_PAGE)?,
            limit: positive(params.limit.as_deref(), DEFAULT_LIMIT)?,
            search: params.search.clone().unwrap_or_default(),
            sort: SortOrder::parse(params.sort.as_deref()),
        })
    }
}

/// One page of the filtered, sorted listing
#[derive(Debug, Clone, PartialEq)]
pub struct MoviePage {
    pub movies: Vec<Movie>,
    pub pagination: Pagination,
}

/// Whether `movie` matches a search term
///
/// An empty term matches everything.
pub fn matches_search(movie: &Movie, search: &str) -> bool {
    if search.is_empty() {
        return true;
    }
    let needle = search.to_lowercase();
    let contains = |field: Option<&str>| {
        field
            .map(|value| value.to_lowercase().contains(&needle))
            .unwrap_or(false)
    };

    contains(Some(movie.title.as_str()))
        || contains(movie.plot.as_deref())
        || contains(movie.director.as_deref())
}

/// Filter, sort and slice a snapshot
pub fn select_page(snapshot: Vec<Movie>, query: &ListQuery) -> MoviePage {
    let mut movies: Vec<Movie> = snapshot
        .into_iter()
        .filter(|movie| matches_search(movie, &query.search))
        .collect();
    movies.sort_by(|a, b| query.sort.compare(a, b));

    let total = movies.len() as u64;
    let start = query.page.saturating_sub(1).saturating_mul(query.limit);
    let movies = movies
        .into_iter()
        .skip(usize::try_from(start).unwrap_or(usize::MAX))
        .take(usize::try_from(query.limit).unwrap_or(usize::MAX))
        .collect();

    MoviePage {
        movies,
        pagination: Pagination {
            current_page: query.page,
            total_pages: total.div_ceil(query.limit.max(1)),
            total_movies: total,
            movies_per_page: query.limit,
        },
    }
}

/// Fetch the movie snapshot through the cache
///
/// On a miss the whole collection is read from `store` and cached for `ttl`.
pub async fn movie_snapshot(
    store: &dyn MovieStore,
    cache: &dyn CacheStore,
    ttl: Duration,
) -> AppResult<Vec<Movie>> {
    get_or_set(cache, MOVIES_CACHE_KEY, ttl, || async {
        Ok::<_, AppError>(store.all_movies().await?)
    })
    .await
}

/// Run the listing pipeline for one request
pub async fn list_movies(
    store: &dyn MovieStore,
    cache: &dyn CacheStore,
    ttl: Duration,
    query: &ListQuery,
) -> AppResult<MoviePage> {
    let snapshot = movie_snapshot(store, cache, ttl).await?;
    Ok(select_page(snapshot, query))
}
