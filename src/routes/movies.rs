//! Movie routes
//!
//! - GET /api/movies - Filtered, sorted, paginated listing
//! - GET /api/movies/{id} - Single movie
//! - POST /api/movies - Create a movie owned by the caller
//! - PUT /api/movies/user - Assign owners to movies without one
//! - PUT /api/movies/{id} - Partial update
//! - DELETE /api/movies/{id} - Delete (admin only), notifying the owner
//!
//! Every route requires a session.

use actix_web::{web, HttpResponse};
use serde_json::Value;
use tracing::info;

use crate::auth::{AdminAuth, Auth};
use crate::catalog::{list_movies as run_listing, ListParams, ListQuery, MoviePage};
use crate::error::{AppError, AppResult};
use crate::models::{
    ApiError, MovieCreatedResponse, MovieDeletedResponse, MovieListResponse, MovieResponse,
    MovieUpdatedResponse, OwnerBackfillResponse,
};
use crate::routes::AppState;

/// GET /api/movies - List movies
///
/// The full catalog is served from a cached snapshot; search, sort and
/// pagination run in memory on each request.
#[utoipa::path(
    get,
    path = "/api/movies",
    tag = "movies",
    params(ListParams),
    responses(
        (status = 200, description = "Page of movies; `found` is false when the page is empty", body = MovieListResponse),
        (status = 400, description = "Page or limit is not a positive integer; `found` is false", body = ApiError),
        (status = 401, description = "Not signed in", body = ApiError),
        (status = 500, description = "Listing failed; `found` is false", body = ApiError)
    )
)]
pub async fn list_movies(
    data: web::Data<AppState>,
    _auth: Auth,
    params: web::Query<ListParams>,
) -> HttpResponse {
    let page = match fetch_page(&data, &params).await {
        Ok(page) => page,
        Err(e) => return e.lookup_response(),
    };

    let found = !page.movies.is_empty();
    let message = if found {
        "Successfully fetched movies"
    } else {
        "Movies not found"
    };

    HttpResponse::Ok().json(MovieListResponse {
        message: message.to_string(),
        movies: page.movies,
        pagination: page.pagination,
        found,
    })
}

async fn fetch_page(data: &AppState, params: &ListParams) -> AppResult<MoviePage> {
    let query = ListQuery::from_params(params)?;
    run_listing(
        data.movies.as_ref(),
        data.cache.as_ref(),
        data.movie_cache_ttl,
        &query,
    )
    .await
}

/// GET /api/movies/{id} - Get a single movie
///
/// Reads the store directly, so a fresh write is visible immediately.
#[utoipa::path(
    get,
    path = "/api/movies/{id}",
    tag = "movies",
    params(
        ("id" = String, Path, description = "Movie id")
    ),
    responses(
        (status = 200, description = "Movie found", body = MovieResponse),
        (status = 400, description = "Malformed id", body = ApiError),
        (status = 404, description = "Movie not found", body = ApiError)
    )
)]
pub async fn get_movie(
    data: web::Data<AppState>,
    _auth: Auth,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let movie = data
        .movies
        .find_movie(&path)
        .await?
        .ok_or_else(|| AppError::not_found("Movie not found"))?;

    Ok(HttpResponse::Ok().json(MovieResponse {
        message: "Movie fetched successfully".to_string(),
        movies: movie,
        found: true,
    }))
}

/// POST /api/movies - Create a movie
///
/// Accepts canonical camelCase fields or OMDb style Title-Case fields,
/// optionally nested under `movieData`.
#[utoipa::path(
    post,
    path = "/api/movies",
    tag = "movies",
    request_body = Object,
    responses(
        (status = 201, description = "Movie created", body = MovieCreatedResponse),
        (status = 400, description = "Invalid movie payload", body = ApiError),
        (status = 401, description = "Not signed in", body = ApiError),
        (status = 409, description = "imdbID already exists", body = ApiError)
    )
)]
pub async fn create_movie(
    data: web::Data<AppState>,
    auth: Auth,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    let movie = data.writer().create(&body, &auth.user_id).await?;

    Ok(HttpResponse::Created().json(MovieCreatedResponse {
        message: "Movies added successfully".to_string(),
        movies: movie,
        created: true,
    }))
}

/// PUT /api/movies/user - Assign a random existing user to every movie without an owner
#[utoipa::path(
    put,
    path = "/api/movies/user",
    tag = "movies",
    responses(
        (status = 200, description = "Owners assigned", body = OwnerBackfillResponse),
        (status = 400, description = "No users exist", body = ApiError),
        (status = 401, description = "Not signed in", body = ApiError)
    )
)]
pub async fn backfill_owners(data: web::Data<AppState>, auth: Auth) -> AppResult<HttpResponse> {
    info!("Owner backfill requested by {}", auth.username);
    let updated = data.writer().backfill_owners().await?;

    Ok(HttpResponse::Ok().json(OwnerBackfillResponse {
        message: "addedBy field added to all movies.".to_string(),
        updated,
    }))
}

/// PUT /api/movies/{id} - Update the supplied fields of a movie
#[utoipa::path(
    put,
    path = "/api/movies/{id}",
    tag = "movies",
    params(
        ("id" = String, Path, description = "Movie id")
    ),
    request_body = Object,
    responses(
        (status = 200, description = "Movie updated", body = MovieUpdatedResponse),
        (status = 400, description = "Invalid payload or malformed id", body = ApiError),
        (status = 404, description = "Movie not found", body = ApiError)
    )
)]
pub async fn update_movie(
    data: web::Data<AppState>,
    _auth: Auth,
    path: web::Path<String>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    let movie = data.writer().update(&path, &body).await?;

    Ok(HttpResponse::Ok().json(MovieUpdatedResponse {
        message: "Movie updated successfully".to_string(),
        movies: movie,
        updated: true,
    }))
}

/// DELETE /api/movies/{id} - Delete a movie
///
/// Requires the `admin` role. The owner is emailed after the delete; a
/// failed email does not fail the request.
#[utoipa::path(
    delete,
    path = "/api/movies/{id}",
    tag = "movies",
    params(
        ("id" = String, Path, description = "Movie id")
    ),
    responses(
        (status = 200, description = "Movie deleted", body = MovieDeletedResponse),
        (status = 401, description = "Not signed in or not an admin", body = ApiError),
        (status = 404, description = "Movie not found", body = ApiError)
    )
)]
pub async fn delete_movie(
    data: web::Data<AppState>,
    AdminAuth(admin): AdminAuth,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    data.writer().delete(&path, &admin).await?;

    Ok(HttpResponse::Ok().json(MovieDeletedResponse {
        message: "Movie deleted successfully".to_string(),
        deleted: true,
    }))
}

/// Configure movie routes
///
/// `/movies/user` is registered before `/movies/{id}` so it is not captured
/// as an id.
pub fn configure_movie_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/movies")
            .route("", web::get().to(list_movies))
            .route("", web::post().to(create_movie))
            .route("/user", web::put().to(backfill_owners))
            .route("/{id}", web::get().to(get_movie))
            .route("/{id}", web::put().to(update_movie))
            .route("/{id}", web::delete().to(delete_movie)),
    );
}
