//! Movie catalog pipelines
//!
//! - [`normalize`]: reconcile client payloads into the canonical movie fields
//! - [`listing`]: cache-aside snapshot with in-memory search, sort and pagination
//! - [`writes`]: create, update, delete and owner backfill

pub mod listing;
pub mod normalize;
pub mod writes;

pub use listing::{list_movies, ListParams, ListQuery, MoviePage, SortOrder, MOVIES_CACHE_KEY};
pub use normalize::normalize_movie;
pub use writes::MovieWriter;
