//! Configuration module for the Movie Catalog API
//!
//! Handles loading environment variables and application configuration.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// MongoDB connection string
    pub mongodb_uri: String,
    /// MongoDB database holding the `movies` and `users` collections
    pub database_name: String,
    /// Redis connection string for the snapshot cache and rate limiter
    pub redis_url: String,
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret key for session token signing
    pub jwt_secret: String,
    /// Origins allowed to call the API with credentials
    pub allowed_origins: Vec<String>,
    /// Whether the session cookie is marked `Secure`
    pub cookie_secure: bool,
    /// Lifetime of the cached full movie snapshot
    pub movie_cache_ttl: Duration,
    /// Drop the cached snapshot after every successful movie write
    pub invalidate_cache_on_write: bool,
    /// Per-client request budget
    pub rate_limit: RateLimitConfig,
    /// SMTP configuration for owner notifications
    pub smtp: Option<SmtpConfig>,
}

/// Fixed-window rate limit settings
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Requests allowed per window for one client address
    pub max_requests: u64,
    /// Window length
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 150,
            window: Duration::from_secs(15 * 60),
        }
    }
}

/// SMTP configuration for email sending
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP server host
    pub host: String,
    /// SMTP server port
    pub port: u16,
    /// SMTP username
    pub username: String,
    /// SMTP password
    pub password: String,
    /// Sender email address
    pub from_email: String,
    /// Sender name
    pub from_name: String,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// # Panics
    /// Panics if required environment variables are not set
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        // Load SMTP config if all required vars are present
        let smtp = match (
            env::var("SMTP_HOST").ok(),
            env::var("SMTP_PORT").ok(),
            env::var("SMTP_USERNAME").ok(),
            env::var("SMTP_PASSWORD").ok(),
            env::var("SMTP_FROM_EMAIL").ok(),
        ) {
            (Some(host), Some(port), Some(username), Some(password), Some(from_email)) => {
                Some(SmtpConfig {
                    host,
                    port: port.parse().unwrap_or(587),
                    username,
                    password,
                    from_email,
                    from_name: env::var("SMTP_FROM_NAME")
                        .unwrap_or_else(|_| "MovieStream Team".to_string()),
                })
            }
            _ => None,
        };

        let defaults = RateLimitConfig::default();

        Self {
            mongodb_uri: env::var("MONGODB_URI").expect("MONGODB_URI must be set"),
            database_name: env::var("DATABASE_NAME")
                .unwrap_or_else(|_| "movie-catalog".to_string()),
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("PORT must be a valid number"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            allowed_origins: parse_origins(
                &env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            ),
            cookie_secure: env_or("COOKIE_SECURE", true),
            movie_cache_ttl: Duration::from_secs(env_or("MOVIE_CACHE_TTL_SECS", 300)),
            invalidate_cache_on_write: env_or("INVALIDATE_CACHE_ON_WRITE", false),
            rate_limit: RateLimitConfig {
                max_requests: env_or("RATE_LIMIT_MAX", defaults.max_requests),
                window: Duration::from_secs(env_or(
                    "RATE_LIMIT_WINDOW_SECS",
                    defaults.window.as_secs(),
                )),
            },
            smtp,
        }
    }
}

/// Read an optional variable, falling back to `default` when it is unset or invalid
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid value for {}: {:?}, using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

/// Split a comma separated origin list, dropping blanks
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
