// libs/branch-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::BranchService;

pub fn branch_routes(config: Arc<AppConfig>, service: Arc<BranchService>) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::list_branches))
        .route("/services", get(handlers::list_services))
        .route("/{branch_id}", get(handlers::get_branch));

    // Catalogue changes and the staff roster are staff-only
    let protected_routes = Router::new()
        .route("/", post(handlers::create_branch))
        .route("/services", post(handlers::create_service))
        .route("/{branch_id}/schedules", put(handlers::set_branch_schedule))
        .route("/{branch_id}/schedules/{day}", delete(handlers::remove_branch_schedule))
        .route(
            "/{branch_id}/staff",
            put(handlers::assign_branch_staff).get(handlers::list_branch_staff),
        )
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(service)
}
