use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_models::{auth::User, error::AppError};
use shared_utils::extractor::require_staff;

use crate::models::{FromBookingRequest, PullNextRequest, TicketQuery, WalkInRequest};
use crate::services::QueueSequencer;

/// Kiosk endpoint; no account needed to take a walk-in ticket.
pub async fn take_walk_in_ticket(
    State(sequencer): State<Arc<QueueSequencer>>,
    Json(request): Json<WalkInRequest>,
) -> Result<Json<Value>, AppError> {
    let ticket = sequencer
        .enqueue_walk_in(request.branch_id, request.service_id, None)
        .await?;
    let view = sequencer.view(ticket).await?;
    Ok(Json(json!({
        "success": true,
        "ticket": view
    })))
}

pub async fn check_in_booking(
    State(sequencer): State<Arc<QueueSequencer>>,
    Extension(user): Extension<User>,
    Json(request): Json<FromBookingRequest>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;
    info!("Booking check-in by staff member {}", user.id);

    let ticket = sequencer.enqueue_from_booking(&request.lookup_code).await?;
    let view = sequencer.view(ticket).await?;
    Ok(Json(json!({
        "success": true,
        "ticket": view
    })))
}

pub async fn pull_next_ticket(
    State(sequencer): State<Arc<QueueSequencer>>,
    Extension(user): Extension<User>,
    Json(request): Json<PullNextRequest>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let ticket = match sequencer.pull_next_for(user.id, request.branch_id).await? {
        Some(ticket) => Some(sequencer.view(ticket).await?),
        None => None,
    };
    Ok(Json(json!({
        "ticket": ticket
    })))
}

pub async fn complete_ticket(
    State(sequencer): State<Arc<QueueSequencer>>,
    Extension(user): Extension<User>,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let ticket = sequencer.complete(ticket_id).await?;
    Ok(Json(json!({
        "success": true,
        "ticket": ticket,
        "slug": ticket.slug()
    })))
}

pub async fn list_today_tickets(
    State(sequencer): State<Arc<QueueSequencer>>,
    Extension(user): Extension<User>,
    Query(query): Query<TicketQuery>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let tickets = sequencer.list_today(&query).await?;
    let views = sequencer.views(tickets).await?;
    Ok(Json(json!({
        "tickets": views,
        "total": views.len()
    })))
}

pub async fn get_ticket(
    State(sequencer): State<Arc<QueueSequencer>>,
    Extension(user): Extension<User>,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let ticket = sequencer.get(ticket_id).await?;
    if !user.is_staff() && ticket.user_id != Some(user.id) {
        return Err(AppError::Forbidden("Not allowed to access this ticket".to_string()));
    }

    let view = sequencer.view(ticket).await?;
    Ok(Json(json!(view)))
}
