//! Movie Catalog API Library
//!
//! This library provides the backend for the movie catalog: a cached,
//! searchable movie listing, per-user dashboard statistics, movie writes
//! and account management, exposed through REST API endpoints.

pub mod auth;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod email;
pub mod error;
pub mod models;
pub mod parser;
pub mod rate_limit;
pub mod routes;

#[cfg(test)]
pub(crate) mod testing;
