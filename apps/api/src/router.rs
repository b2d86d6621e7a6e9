use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use booking_cell::{booking_routes, staff_booking_routes, BookingService, StaffBookingService};
use branch_cell::{branch_routes, BranchService};
use queue_cell::{queue_routes, QueueSequencer};
use shared_config::AppConfig;

pub struct Services {
    pub branches: Arc<BranchService>,
    pub bookings: Arc<BookingService>,
    pub staff_bookings: Arc<StaffBookingService>,
    pub queue: Arc<QueueSequencer>,
}

pub fn create_router(config: Arc<AppConfig>, services: Services) -> Router {
    Router::new()
        .route("/", get(|| async { "Branch queue API is running!" }))
        .nest("/branches", branch_routes(config.clone(), services.branches))
        .nest(
            "/records",
            booking_routes(config.clone(), services.bookings)
                .merge(staff_booking_routes(config.clone(), services.staff_bookings)),
        )
        .nest("/queue", queue_routes(config, services.queue))
}
