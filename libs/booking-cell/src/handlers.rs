// libs/booking-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use shared_models::{auth::User, error::AppError};

use crate::models::{
    Booking, BookingQuery, BookingStatus, CreateBookingRequest, CreateStaffBookingRequest, StaffBooking,
    StaffBookingQuery, UpdateBookingRequest, UpdateStatusRequest,
};
use crate::services::{BookingService, StaffBookingService};

fn ensure_can_access(user: &User, booking: &Booking) -> Result<(), AppError> {
    if user.is_staff() || booking.is_owned_by(user.id) {
        Ok(())
    } else {
        warn!("User {} denied access to booking {}", user.id, booking.id);
        Err(AppError::Forbidden("Not allowed to access this booking".to_string()))
    }
}

fn ensure_can_access_staff_booking(user: &User, booking: &StaffBooking) -> Result<(), AppError> {
    if user.is_staff() || booking.is_owned_by(user.id) {
        Ok(())
    } else {
        warn!("User {} denied access to staff booking {}", user.id, booking.id);
        Err(AppError::Forbidden("Not allowed to access this booking".to_string()))
    }
}

// Completion is recorded by staff; clients may only cancel
fn ensure_status_allowed(user: &User, status: BookingStatus) -> Result<(), AppError> {
    if user.is_staff() || status == BookingStatus::Canceled {
        Ok(())
    } else {
        warn!("User {} tried to set status {}", user.id, status);
        Err(AppError::Forbidden("Only staff may set this status".to_string()))
    }
}

pub async fn create_booking(
    State(service): State<Arc<BookingService>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let booking = service.create(request, user.id).await?;
    let view = service.view(booking).await?;
    Ok(Json(json!({
        "success": true,
        "booking": view
    })))
}

pub async fn list_bookings(
    State(service): State<Arc<BookingService>>,
    Extension(user): Extension<User>,
    Query(mut query): Query<BookingQuery>,
) -> Result<Json<Value>, AppError> {
    // Clients only ever see their own bookings
    if !user.is_staff() {
        query.requester_id = Some(user.id);
    }

    let bookings = service.list(&query).await?;
    let views = service.views(bookings).await?;
    Ok(Json(json!({
        "bookings": views,
        "total": views.len()
    })))
}

pub async fn get_booking(
    State(service): State<Arc<BookingService>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking = service.get(booking_id).await?;
    ensure_can_access(&user, &booking)?;

    let view = service.view(booking).await?;
    Ok(Json(json!(view)))
}

pub async fn get_booking_by_code(
    State(service): State<Arc<BookingService>>,
    Extension(user): Extension<User>,
    Path(code): Path<String>,
) -> Result<Json<Value>, AppError> {
    let booking = service.find_by_code(&code).await?;
    ensure_can_access(&user, &booking)?;

    let view = service.view(booking).await?;
    Ok(Json(json!(view)))
}

pub async fn update_booking(
    State(service): State<Arc<BookingService>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<UpdateBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let booking = service.get(booking_id).await?;
    ensure_can_access(&user, &booking)?;

    let booking = service.update(booking_id, request).await?;
    Ok(Json(json!({
        "success": true,
        "booking": booking
    })))
}

pub async fn update_booking_status(
    State(service): State<Arc<BookingService>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let booking = service.get(booking_id).await?;
    ensure_can_access(&user, &booking)?;
    ensure_status_allowed(&user, request.status)?;
    info!("Status change to {} requested by user {}", request.status, user.id);

    let booking = service.update_status(booking_id, request.status).await?;
    Ok(Json(json!({
        "success": true,
        "booking": booking
    })))
}

pub async fn cancel_booking(
    State(service): State<Arc<BookingService>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking = service.get(booking_id).await?;
    ensure_can_access(&user, &booking)?;

    let booking = service.cancel(booking_id).await?;
    Ok(Json(json!({
        "success": true,
        "booking": booking
    })))
}

// ==============================================================================
// STAFF BOOKINGS
// ==============================================================================

pub async fn create_staff_booking(
    State(service): State<Arc<StaffBookingService>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateStaffBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let booking = service.create(request, user.id).await?;
    Ok(Json(json!({
        "success": true,
        "booking": booking
    })))
}

pub async fn list_staff_bookings(
    State(service): State<Arc<StaffBookingService>>,
    Extension(user): Extension<User>,
    Query(mut query): Query<StaffBookingQuery>,
) -> Result<Json<Value>, AppError> {
    if !user.is_staff() {
        query.requester_id = Some(user.id);
    }

    let bookings = service.list(&query).await?;
    Ok(Json(json!({
        "bookings": bookings,
        "total": bookings.len()
    })))
}

pub async fn get_staff_booking(
    State(service): State<Arc<StaffBookingService>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking = service.get(booking_id).await?;
    ensure_can_access_staff_booking(&user, &booking)?;
    Ok(Json(json!(booking)))
}

pub async fn update_staff_booking_status(
    State(service): State<Arc<StaffBookingService>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let booking = service.get(booking_id).await?;
    ensure_can_access_staff_booking(&user, &booking)?;
    ensure_status_allowed(&user, request.status)?;

    let booking = service.update_status(booking_id, request.status).await?;
    Ok(Json(json!({
        "success": true,
        "booking": booking
    })))
}

pub async fn cancel_staff_booking(
    State(service): State<Arc<StaffBookingService>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking = service.get(booking_id).await?;
    ensure_can_access_staff_booking(&user, &booking)?;

    let booking = service.cancel(booking_id).await?;
    Ok(Json(json!({
        "success": true,
        "booking": booking
    })))
}
