//! Data models for the Movie Catalog API
//!
//! This module contains all data structures used throughout the application,
//! including the movie and user documents, request bodies and API envelopes.

pub mod serde_helpers;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::PlainPassword;

// Re-export dashboard models for convenience
pub use crate::dashboard::{
    AwardTotals, BoxOfficeTitle, DashboardStats, NamedCount, PopularGenre, RatedTitle,
    TimelinePoint, VotedTitle,
};

/// Content rating certificates accepted for a movie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum Rated {
    #[serde(rename = "G")]
    G,
    #[serde(rename = "PG")]
    Pg,
    #[serde(rename = "PG-13")]
    Pg13,
    #[serde(rename = "R")]
    R,
    #[serde(rename = "NC-17")]
    Nc17,
    #[serde(rename = "TV-14")]
    Tv14,
    #[serde(rename = "TV-G")]
    TvG,
    #[serde(rename = "TV-PG")]
    TvPg,
    #[serde(rename = "TV-MA")]
    TvMa,
    #[default]
    #[serde(rename = "Not Rated")]
    NotRated,
    #[serde(rename = "N/A")]
    NotAvailable,
    #[serde(rename = "Approved")]
    Approved,
}

impl Rated {
    pub const ALL: [Rated; 12] = [
        Rated::G,
        Rated::Pg,
        Rated::Pg13,
        Rated::R,
        Rated::Nc17,
        Rated::Tv14,
        Rated::TvG,
        Rated::TvPg,
        Rated::TvMa,
        Rated::NotRated,
        Rated::NotAvailable,
        Rated::Approved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rated::G => "G",
            Rated::Pg => "PG",
            Rated::Pg13 => "PG-13",
            Rated::R => "R",
            Rated::Nc17 => "NC-17",
            Rated::Tv14 => "TV-14",
            Rated::TvG => "TV-G",
            Rated::TvPg => "TV-PG",
            Rated::TvMa => "TV-MA",
            Rated::NotRated => "Not Rated",
            Rated::NotAvailable => "N/A",
            Rated::Approved => "Approved",
        }
    }
}

impl FromStr for Rated {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Rated::ALL
            .into_iter()
            .find(|rated| rated.as_str() == trimmed)
            .ok_or_else(|| format!("`{}` is not a valid rating", trimmed))
    }
}

impl fmt::Display for Rated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MovieType {
    #[default]
    Movie,
    Series,
    Episode,
}

impl FromStr for MovieType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "movie" => Ok(MovieType::Movie),
            "series" => Ok(MovieType::Series),
            "episode" => Ok(MovieType::Episode),
            other => Err(format!("`{}` is not a valid type", other)),
        }
    }
}

/// A single external rating, e.g. Rotten Tomatoes "94%"
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Rating {
    #[serde(rename = "Source", alias = "source")]
    pub source: String,
    #[serde(rename = "Value", alias = "value")]
    pub value: String,
}

fn default_metascore() -> String {
    "N/A".to_string()
}

fn default_language() -> Vec<String> {
    vec!["English".to_string()]
}

fn default_true() -> bool {
    true
}

/// A movie document in the `movies` collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    /// Hex encoded document id
    #[serde(rename = "_id", deserialize_with = "serde_helpers::object_id::deserialize")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Free-form year, e.g. "2010" or "2010–2014"
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub rated: Rated,
    /// Release date as published, e.g. "16 Jul 2010"
    #[serde(default)]
    pub released: Option<String>,
    /// Runtime in minutes
    #[serde(default, deserialize_with = "serde_helpers::integer::deserialize")]
    pub runtime: i64,
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub writer: Vec<String>,
    #[serde(default)]
    pub actors: Vec<String>,
    #[serde(default)]
    pub plot: Option<String>,
    #[serde(default = "default_language")]
    pub language: Vec<String>,
    #[serde(default)]
    pub country: Vec<String>,
    #[serde(default)]
    pub awards: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub ratings: Vec<Rating>,
    #[serde(default = "default_metascore")]
    pub metascore: String,
    #[serde(default)]
    pub imdb_rating: f64,
    #[serde(default, deserialize_with = "serde_helpers::integer::deserialize")]
    pub imdb_votes: i64,
    #[serde(default, rename = "imdbID")]
    pub imdb_id: Option<String>,
    #[serde(default, rename = "type")]
    pub movie_type: MovieType,
    #[serde(default, deserialize_with = "serde_helpers::optional_integer::deserialize")]
    pub total_seasons: Option<i64>,
    #[serde(default)]
    pub dvd: Option<String>,
    #[serde(default)]
    pub box_office: Option<String>,
    #[serde(default)]
    pub production: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Hex id of the owning user
    #[serde(default, deserialize_with = "serde_helpers::optional_object_id::deserialize")]
    pub added_by: Option<String>,
    #[serde(default, with = "serde_helpers::optional_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "serde_helpers::optional_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Normalized movie fields; `None` means "not supplied"
///
/// Produced by [`crate::catalog::normalize_movie`]. Creation fills the gaps
/// with defaults, updates `$set` only the supplied fields.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MoviePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rated: Option<Rated>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub released: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writer: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awards: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratings: Option<Vec<Rating>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metascore: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imdb_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imdb_votes: Option<i64>,
    #[serde(rename = "imdbID", skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub movie_type: Option<MovieType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_seasons: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dvd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub box_office: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl MoviePatch {
    /// Build a new movie document owned by `owner_id`, applying creation defaults
    pub fn into_movie(self, id: String, owner_id: String, now: DateTime<Utc>) -> Movie {
        Movie {
            id,
            title: self.title.unwrap_or_default(),
            year: self.year,
            rated: self.rated.unwrap_or_default(),
            released: self.released,
            runtime: self.runtime.unwrap_or(0),
            genre: self.genre.unwrap_or_default(),
            director: Some(self.director.unwrap_or_else(|| "N/A".to_string())),
            writer: self.writer.unwrap_or_default(),
            actors: self.actors.unwrap_or_default(),
            plot: self.plot,
            language: self.language.unwrap_or_else(default_language),
            country: self.country.unwrap_or_default(),
            awards: self.awards,
            poster: self.poster,
            ratings: self.ratings.unwrap_or_default(),
            metascore: self.metascore.unwrap_or_else(default_metascore),
            imdb_rating: self.imdb_rating.unwrap_or(0.0),
            imdb_votes: self.imdb_votes.unwrap_or(0),
            imdb_id: self.imdb_id,
            movie_type: self.movie_type.unwrap_or_default(),
            total_seasons: self.total_seasons,
            dvd: self.dvd,
            box_office: self.box_office,
            production: self.production,
            website: self.website,
            is_active: self.is_active.unwrap_or(true),
            added_by: Some(owner_id),
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// Apply the supplied fields to an existing movie
    pub fn apply_to(self, movie: &mut Movie) {
        macro_rules! set {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = self.$field { movie.$field = value; })*
            };
        }
        macro_rules! set_optional {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = self.$field { movie.$field = Some(value); })*
            };
        }

        set!(
            title, rated, runtime, genre, writer, actors, language, country, ratings,
            metascore, imdb_rating, imdb_votes, movie_type, is_active,
        );
        set_optional!(
            year, released, director, plot, awards, poster, imdb_id, total_seasons, dvd,
            box_office, production, website,
        );
    }
}

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// Represents a user account
///
/// The password hash is read from storage but never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Hex encoded user id
    #[serde(rename = "_id", deserialize_with = "serde_helpers::object_id::deserialize")]
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub role: Role,
    /// Profile photo URL, empty when unset
    #[serde(default)]
    pub profile_photo: String,
    #[serde(default, with = "serde_helpers::optional_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "serde_helpers::optional_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Validated signup data handed to the user store
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: PlainPassword,
}

/// Request body for user registration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for user sign in
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct SigninRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for a password change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
}

/// Request body for setting the profile photo URL
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePhotoRequest {
    #[serde(default)]
    pub profile_photo: String,
}

/// Pagination metadata returned with a listing page
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_movies: u64,
    pub movies_per_page: u64,
}

/// Response for `GET /api/movies`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct MovieListResponse {
    pub message: String,
    pub movies: Vec<Movie>,
    pub pagination: Pagination,
    pub found: bool,
}

/// Response for `GET /api/movies/{id}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct MovieResponse {
    pub message: String,
    pub movies: Movie,
    pub found: bool,
}

/// Response for `POST /api/movies`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct MovieCreatedResponse {
    pub message: String,
    pub movies: Movie,
    pub created: bool,
}

/// Response for `PUT /api/movies/{id}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct MovieUpdatedResponse {
    pub message: String,
    pub movies: Movie,
    pub updated: bool,
}

/// Response for `DELETE /api/movies/{id}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct MovieDeletedResponse {
    pub message: String,
    pub deleted: bool,
}

/// Response for `PUT /api/movies/user`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct OwnerBackfillResponse {
    pub message: String,
    /// Number of movies that received an owner
    pub updated: u64,
}

/// Response carrying the signed-in user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct UserResponse {
    pub message: String,
    pub user: User,
}

/// Response carrying only a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Whether the operation was successful (always false for errors)
    pub success: bool,
    /// Error message describing what went wrong
    pub message: String,
    /// ISO timestamp of when the error occurred
    pub timestamp: String,
    /// Set to false by the listing and dashboard routes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub found: Option<bool>,
}

impl ApiError {
    /// Create a new API error response with the current timestamp
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            timestamp: Utc::now().to_rfc3339(),
            found: None,
        }
    }

    /// Create a new API error response with a custom timestamp
    pub fn with_timestamp(message: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            success: false,
            message: message.into(),
            timestamp: timestamp.to_rfc3339(),
            found: None,
        }
    }

    /// Mark the error as a failed lookup (`found: false`)
    pub fn not_found(mut self) -> Self {
        self.found = Some(false);
        self
    }
}
