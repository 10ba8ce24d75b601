pub mod admin;
pub mod client;
pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::AppState;

/// All API routes. CORS and tracing layers are added by the caller.
pub fn routes() -> Router<Arc<AppState>> {
    // Public
    let public_routes = Router::new()
        .route("/api/health", get(health::health))
        .route("/api/slots", get(client::list_slots))
        .route("/api/availability", get(client::check_availability))
        .route("/api/bookings", post(client::create_booking));

    // Staff and admin; each handler checks the role it needs
    let admin_routes = Router::new()
        .route("/api/admin/bookings", get(admin::list_bookings))
        .route(
            "/api/admin/bookings/{id}/approve",
            post(admin::approve_booking),
        )
        .route(
            "/api/admin/bookings/{id}/reject",
            post(admin::reject_booking),
        )
        .route(
            "/api/admin/exceptions",
            get(admin::list_exceptions).post(admin::set_exception),
        )
        .route(
            "/api/admin/exceptions/range",
            post(admin::set_range_exception),
        )
        .route(
            "/api/admin/exceptions/{field_name}/{date}",
            delete(admin::remove_exception),
        );

    Router::new().merge(public_routes).merge(admin_routes)
}
