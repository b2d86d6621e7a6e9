use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::QueueSequencer;

pub fn queue_routes(config: Arc<AppConfig>, sequencer: Arc<QueueSequencer>) -> Router {
    let public_routes = Router::new()
        .route("/walk-in", post(handlers::take_walk_in_ticket));

    let protected_routes = Router::new()
        .route("/from-booking", post(handlers::check_in_booking))
        .route("/next", post(handlers::pull_next_ticket))
        .route("/today", get(handlers::list_today_tickets))
        .route("/{ticket_id}", get(handlers::get_ticket))
        .route("/{ticket_id}/complete", post(handlers::complete_ticket))
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(sequencer)
}
