//! Global error handling module for the Movie Catalog API
//!
//! This module provides a unified error type that handles all application errors
//! and converts them to appropriate HTTP responses with consistent JSON structure.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;
use crate::cache::CacheError;
use crate::db::StoreError;
use crate::models::ApiError;

/// Application-wide error type that unifies all error sources
#[derive(Debug, Error)]
pub enum AppError {
    /// Persistence store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Cache store errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Authentication-related errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Validation errors (bad request)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request - Validation errors
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Store(StoreError::InvalidId(_)) => StatusCode::BAD_REQUEST,

            // 401 Unauthorized - Authentication errors, including role failures
            AppError::Auth(auth_err) => match auth_err {
                AuthError::HashingError(_) | AuthError::TokenGenerationError(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ => StatusCode::UNAUTHORIZED,
            },

            // 404 Not Found
            AppError::NotFound(_) => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::Store(StoreError::Duplicate(_)) => StatusCode::CONFLICT,

            // 500 Internal Server Error - Store, Cache, Internal errors
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),

            AppError::Auth(auth_err) => match auth_err {
                AuthError::InvalidCredentials => "Invalid email or password".to_string(),
                AuthError::TokenExpired => "Session has expired, please sign in again".to_string(),
                AuthError::MissingToken => "You need to be logged in to access this route".to_string(),
                AuthError::InvalidAuthHeaderFormat => {
                    "Invalid authorization header format, expected 'Bearer <token>'".to_string()
                }
                AuthError::TokenVerificationError(_) => "Invalid session token".to_string(),
                AuthError::InsufficientRole => "User does not have access to this route".to_string(),
                AuthError::HashingError(_) => "Authentication processing error".to_string(),
                AuthError::TokenGenerationError(_) => "Failed to create session".to_string(),
            },

            AppError::Store(store_err) => match store_err {
                StoreError::InvalidId(id) => format!("Invalid id: {}", id),
                StoreError::Duplicate(field) => format!("{} already exists", field),
                _ => "Database operation failed".to_string(),
            },

            AppError::Cache(_) => "Cache operation failed".to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status_code()
    }

    fn error_response(&self) -> HttpResponse {
        self.respond(ApiError::new(self.user_message()))
    }
}

impl AppError {
    /// Error response for routes whose bodies always carry `found`
    pub fn lookup_response(&self) -> HttpResponse {
        self.respond(ApiError::new(self.user_message()).not_found())
    }

    fn respond(&self, body: ApiError) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        HttpResponse::build(status).json(body)
    }
}

/// Result type alias for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;
