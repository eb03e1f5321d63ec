//! Cache module for the Movie Catalog API
//!
//! A small key/value seam over Redis. The listing pipeline keeps its full
//! movie snapshot here and the rate limiter keeps its window counters here,
//! so both take a `&dyn CacheStore` and can be exercised against an
//! in-memory store in tests.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Cache store errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Failed to encode cache payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// State of a fixed-window counter after an increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// Hits recorded in the current window, including this one
    pub count: u64,
    /// Time until the window closes
    pub resets_in: Duration,
}

/// Key/value cache with expiry
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store `value` under `key`, expiring after `ttl`
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Count a hit against `key`; the first hit opens a window of length `window`
    async fn incr_window(&self, key: &str, window: Duration) -> CacheResult<WindowCount>;

    async fn ping(&self) -> CacheResult<()>;
}

/// Cache-aside read of a JSON value
///
/// Returns the cached value when `key` holds one that decodes as `T`.
/// Otherwise runs `fetch`, stores its result under `key` for `ttl` and returns
/// it. A payload that no longer decodes is logged and treated as a miss.
pub async fn get_or_set<T, E, F, Fut>(
    cache: &dyn CacheStore,
    key: &str,
    ttl: Duration,
    fetch: F,
) -> Result<T, E>
where
    T: Serialize + DeserializeOwned,
    E: From<CacheError>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    if let Some(payload) = cache.get(key).await? {
        match serde_json::from_str(&payload) {
            Ok(value) => {
                debug!("Cache hit for {}", key);
                return Ok(value);
            }
            Err(e) => warn!("Discarding unreadable cache entry {}: {}", key, e),
        }
    }

    debug!("Cache miss for {}", key);
    let fresh = fetch().await?;
    let payload = serde_json::to_string(&fresh).map_err(CacheError::from)?;
    cache.set_ex(key, &payload, ttl).await?;

    Ok(fresh)
}

/// Redis-backed [`CacheStore`]
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    /// Connect to Redis
    ///
    /// The connection manager reconnects on its own after transient failures.
    pub async fn connect(redis_url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let manager = client.get_connection_manager().await?;
        info!("Connected to Redis");
        Ok(Self { manager })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.manager.clone();
        Ok(conn.get(key).await?)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn incr_window(&self, key: &str, window: Duration) -> CacheResult<WindowCount> {
        let mut conn = self.manager.clone();
        let window_secs = window.as_secs().max(1) as i64;

        let count: u64 = conn.incr(key, 1u64).await?;
        if count == 1 {
            let _: () = conn.expire(key, window_secs).await?;
        }

        let ttl: i64 = conn.ttl(key).await?;
        let resets_in = if ttl > 0 {
            Duration::from_secs(ttl as u64)
        } else {
            // Counter lost its expiry; restart the window rather than block forever
            let _: () = conn.expire(key, window_secs).await?;
            Duration::from_secs(window_secs as u64)
        };

        Ok(WindowCount { count, resets_in })
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
