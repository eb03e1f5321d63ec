//! Fixed-window rate limiting per client address
//!
//! Counters live in the shared [`CacheStore`] under `rate_limit:{addr}`, so
//! every server instance draws from the same budget. The limiter fails open:
//! when the cache cannot be reached the request goes through and a warning is
//! logged.

use std::sync::Arc;

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header::{HeaderName, HeaderValue, RETRY_AFTER};
use actix_web::middleware::Next;
use actix_web::{web, Error, HttpResponse};
use tracing::warn;

use crate::cache::CacheStore;
use crate::config::RateLimitConfig;
use crate::models::ApiError;

const KEY_PREFIX: &str = "rate_limit";
const LIMITED_MESSAGE: &str = "Too many requests, please try again later.";

/// Outcome of counting one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u64, reset_secs: u64 },
    Limited { retry_after_secs: u64 },
    /// The counter could not be read; the request is let through
    Unchecked,
}

/// Shared limiter state, registered as app data
pub struct RateLimiter {
    cache: Arc<dyn CacheStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(cache: Arc<dyn CacheStore>, config: RateLimitConfig) -> Self {
        Self { cache, config }
    }

    pub fn limit(&self) -> u64 {
        self.config.max_requests
    }

    /// Count one request from `client` against its window
    pub async fn check(&self, client: &str) -> Decision {
        let key = format!("{}:{}", KEY_PREFIX, client);

        match self.cache.incr_window(&key, self.config.window).await {
            Ok(window) => {
                let reset_secs = window.resets_in.as_secs().max(1);
                if window.count > self.config.max_requests {
                    Decision::Limited {
                        retry_after_secs: reset_secs,
                    }
                } else {
                    Decision::Allowed {
                        remaining: self.config.max_requests - window.count,
                        reset_secs,
                    }
                }
            }
            Err(e) => {
                warn!("Rate limiter unavailable, letting {} through: {}", client, e);
                Decision::Unchecked
            }
        }
    }
}

fn client_address(req: &ServiceRequest) -> String {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn set_header(response_headers: &mut actix_web::http::header::HeaderMap, name: &'static str, value: u64) {
    response_headers.insert(HeaderName::from_static(name), HeaderValue::from(value));
}

/// Middleware enforcing the [`RateLimiter`] registered as `web::Data`
///
/// Mount with `actix_web::middleware::from_fn(rate_limit)`. Requests pass
/// straight through when no limiter is registered.
pub async fn rate_limit<B: MessageBody>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    let Some(limiter) = req.app_data::<web::Data<RateLimiter>>().cloned() else {
        return next.call(req).await.map(ServiceResponse::map_into_left_body);
    };

    let client = client_address(&req);
    match limiter.check(&client).await {
        Decision::Limited { retry_after_secs } => {
            warn!("Rate limit exceeded for {}", client);
            let response = HttpResponse::TooManyRequests()
                .insert_header((RETRY_AFTER, retry_after_secs))
                .insert_header(("RateLimit-Limit", limiter.limit()))
                .insert_header(("RateLimit-Remaining", 0u64))
                .insert_header(("RateLimit-Reset", retry_after_secs))
                .json(ApiError::new(LIMITED_MESSAGE));
            Ok(req.into_response(response).map_into_right_body())
        }
        Decision::Allowed {
            remaining,
            reset_secs,
        } => {
            let mut res = next.call(req).await?;
            let headers = res.headers_mut();
            set_header(headers, "ratelimit-limit", limiter.limit());
            set_header(headers, "ratelimit-remaining", remaining);
            set_header(headers, "ratelimit-reset", reset_secs);
            Ok(res.map_into_left_body())
        }
        Decision::Unchecked => next.call(req).await.map(ServiceResponse::map_into_left_body),
    }
}
