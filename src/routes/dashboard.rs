//! Dashboard route
//!
//! - GET /api/dashboard - Statistics over the caller's own movies

use actix_web::{web, HttpResponse};

use crate::auth::Auth;
use crate::dashboard::compute_dashboard;
use crate::models::{ApiError, DashboardStats};
use crate::routes::AppState;

/// GET /api/dashboard - Aggregate statistics for the signed-in user
#[utoipa::path(
    get,
    path = "/api/dashboard",
    tag = "dashboard",
    responses(
        (status = 200, description = "Dashboard statistics", body = DashboardStats),
        (status = 401, description = "Not signed in", body = ApiError),
        (status = 500, description = "Aggregation failed; the body carries `found: false`", body = ApiError)
    )
)]
pub async fn get_dashboard(data: web::Data<AppState>, auth: Auth) -> HttpResponse {
    match compute_dashboard(data.movies.as_ref(), &auth.user_id).await {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(e) => e.lookup_response(),
    }
}

/// Configure dashboard routes
pub fn configure_dashboard_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/dashboard", web::get().to(get_dashboard));
}
