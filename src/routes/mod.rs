//! API Routes module for the Movie Catalog API
//!
//! Handlers are grouped by resource:
//! - [`movies`]: listing, lookup and writes under `/api/movies`
//! - [`dashboard`]: per-user statistics under `/api/dashboard`
//! - [`user`]: account lifecycle under `/api/user`

pub mod dashboard;
pub mod movies;
pub mod user;

use std::sync::Arc;
use std::time::Duration;

use actix_web::web;
use utoipa::OpenApi;

use crate::cache::CacheStore;
use crate::catalog::MovieWriter;
use crate::db::{MovieStore, UserStore};
use crate::email::Notifier;
use crate::models::{
    ApiError, AwardTotals, BoxOfficeTitle, DashboardStats, MessageResponse, Movie,
    MovieCreatedResponse, MovieDeletedResponse, MovieListResponse, MovieResponse, MovieType,
    MovieUpdatedResponse, NamedCount, OwnerBackfillResponse, Pagination, PopularGenre,
    ProfilePhotoRequest, Rated, RatedTitle, Rating, Role, SigninRequest, SignupRequest,
    TimelinePoint, UpdatePasswordRequest, User, UserResponse, VotedTitle,
};

/// Application state shared across handlers
pub struct AppState {
    pub movies: Arc<dyn MovieStore>,
    pub users: Arc<dyn UserStore>,
    pub cache: Arc<dyn CacheStore>,
    /// `None` when SMTP is not configured
    pub notifier: Option<Arc<dyn Notifier>>,
    /// Lifetime of the cached movie snapshot
    pub movie_cache_ttl: Duration,
    pub invalidate_cache_on_write: bool,
}

impl AppState {
    /// Write pipeline bound to this state's stores
    pub fn writer(&self) -> MovieWriter<'_> {
        MovieWriter {
            movies: self.movies.as_ref(),
            users: self.users.as_ref(),
            cache: self.cache.as_ref(),
            notifier: self.notifier.as_deref(),
            invalidate_on_write: self.invalidate_cache_on_write,
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Movie Catalog API",
        version = "0.1.0",
        description = "Movie catalog with cached listing, per-user dashboards and account management",
        license(
            name = "MIT"
        )
    ),
    paths(
        movies::list_movies,
        movies::get_movie,
        movies::create_movie,
        movies::backfill_owners,
        movies::update_movie,
        movies::delete_movie,
        dashboard::get_dashboard,
        user::signup,
        user::signin,
        user::get_me,
        user::update_password,
        user::delete_me,
        user::update_profile_photo,
        user::logout
    ),
    components(
        schemas(
            Movie,
            Rated,
            MovieType,
            Rating,
            Pagination,
            MovieListResponse,
            MovieResponse,
            MovieCreatedResponse,
            MovieUpdatedResponse,
            MovieDeletedResponse,
            OwnerBackfillResponse,
            DashboardStats,
            AwardTotals,
            NamedCount,
            TimelinePoint,
            RatedTitle,
            VotedTitle,
            BoxOfficeTitle,
            PopularGenre,
            User,
            Role,
            SignupRequest,
            SigninRequest,
            UpdatePasswordRequest,
            ProfilePhotoRequest,
            UserResponse,
            MessageResponse,
            ApiError
        )
    ),
    tags(
        (name = "movies", description = "Movie catalog endpoints"),
        (name = "dashboard", description = "Per-user catalog statistics"),
        (name = "user", description = "Account endpoints")
    )
)]
pub struct ApiDoc;

/// Configure API routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(movies::configure_movie_routes)
            .configure(dashboard::configure_dashboard_routes)
            .configure(user::configure_user_routes),
    );
}
