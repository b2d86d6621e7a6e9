// libs/booking-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::{BookingService, StaffBookingService};

pub fn booking_routes(config: Arc<AppConfig>, service: Arc<BookingService>) -> Router {
    // Every booking route needs a requester
    Router::new()
        .route("/", post(handlers::create_booking).get(handlers::list_bookings))
        .route("/code/{code}", get(handlers::get_booking_by_code))
        .route("/{booking_id}", get(handlers::get_booking).put(handlers::update_booking))
        .route("/{booking_id}/status", patch(handlers::update_booking_status))
        .route("/{booking_id}/cancel", post(handlers::cancel_booking))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(service)
}

/// Meetings with a named employee, mounted next to the booking routes under `/staff`.
pub fn staff_booking_routes(config: Arc<AppConfig>, service: Arc<StaffBookingService>) -> Router {
    Router::new()
        .route("/staff", post(handlers::create_staff_booking).get(handlers::list_staff_bookings))
        .route("/staff/{booking_id}", get(handlers::get_staff_booking))
        .route("/staff/{booking_id}/status", patch(handlers::update_staff_booking_status))
        .route("/staff/{booking_id}/cancel", post(handlers::cancel_staff_booking))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(service)
}
