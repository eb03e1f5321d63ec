//! Movie Catalog API Server
//!
//! Main entry point for the movie catalog REST API service.

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::from_fn;
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use movie_catalog::auth::AuthConfig;
use movie_catalog::cache::{CacheStore, RedisCache};
use movie_catalog::config::Config;
use movie_catalog::db::{Database, MovieStore};
use movie_catalog::email::{EmailService, Notifier};
use movie_catalog::rate_limit::{rate_limit, RateLimiter};
use movie_catalog::routes::{configure_routes, ApiDoc, AppState};

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Store and cache health check endpoint
async fn db_health_check(data: web::Data<AppState>) -> impl Responder {
    let database = data.movies.ping().await;
    let cache = data.cache.ping().await;

    match (database, cache) {
        (Ok(()), Ok(())) => HttpResponse::Ok().json(serde_json::json!({
            "status": "healthy",
            "database": "connected",
            "cache": "connected",
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
        (database, cache) => {
            if let Err(e) = &database {
                error!("Database health check failed: {}", e);
            }
            if let Err(e) = &cache {
                error!("Cache health check failed: {}", e);
            }
            let state = |ok: bool| if ok { "connected" } else { "disconnected" };
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "unhealthy",
                "database": state(database.is_ok()),
                "cache": state(cache.is_ok()),
                "timestamp": chrono::Utc::now().to_rfc3339()
            }))
        }
    }
}

fn cors(allowed_origins: &[String]) -> Cors {
    allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .supports_credentials()
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let bind_address = format!("{}:{}", config.host, config.port);

    info!("Connecting to MongoDB...");
    let db = Database::new(&config.mongodb_uri, &config.database_name)
        .await
        .expect("Failed to connect to MongoDB");

    info!("Ensuring indexes...");
    db.ensure_indexes()
        .await
        .expect("Failed to create database indexes");

    info!("Connecting to Redis...");
    let cache = Arc::new(
        RedisCache::connect(&config.redis_url)
            .await
            .expect("Failed to connect to Redis"),
    );

    let notifier: Option<Arc<dyn Notifier>> = match EmailService::from_config(config.smtp.clone()) {
        Ok(service) => Some(Arc::new(service)),
        Err(e) => {
            warn!("Deletion notices disabled: {}", e);
            None
        }
    };

    let db = Arc::new(db);
    let app_state = web::Data::new(AppState {
        movies: db.clone(),
        users: db,
        cache: cache.clone(),
        notifier,
        movie_cache_ttl: config.movie_cache_ttl,
        invalidate_cache_on_write: config.invalidate_cache_on_write,
    });
    let auth_config = web::Data::new(AuthConfig {
        jwt_secret: config.jwt_secret.clone(),
        cookie_secure: config.cookie_secure,
    });
    let limiter = web::Data::new(RateLimiter::new(cache, config.rate_limit));

    info!("Starting Movie Catalog API server on {}", bind_address);

    let openapi = ApiDoc::openapi();
    let allowed_origins = config.allowed_origins.clone();

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(auth_config.clone())
            .app_data(limiter.clone())
            .wrap(from_fn(rate_limit))
            .wrap(cors(&allowed_origins))
            .route("/health", web::get().to(health_check))
            .route("/health/db", web::get().to(db_health_check))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone())
            )
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
