// libs/branch-cell/src/handlers.rs
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

use crate::models::{AssignStaffRequest, BranchQuery, CreateBranchRequest, CreateServiceRequest, DayOfWeek, WeeklySchedule};
use crate::services::BranchService;

pub async fn list_branches(
    State(service): State<Arc<BranchService>>,
    Query(query): Query<BranchQuery>,
) -> Result<Json<Value>, AppError> {
    let branches = service.list_branch_views(&query).await?;
    Ok(Json(json!({
        "branches": branches,
        "total": branches.len()
    })))
}

pub async fn get_branch(
    State(service): State<Arc<BranchService>>,
    Path(branch_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let branch = service.get_branch_view(branch_id).await?;
    Ok(Json(json!(branch)))
}

pub async fn create_branch(
    State(service): State<Arc<BranchService>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateBranchRequest>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;
    info!("Branch creation requested by user: {}", user.id);

    let branch = service.create_branch(request).await?;
    Ok(Json(json!({
        "success": true,
        "branch": branch
    })))
}

pub async fn set_branch_schedule(
    State(service): State<Arc<BranchService>>,
    Extension(user): Extension<User>,
    Path(branch_id): Path<Uuid>,
    Json(schedule): Json<WeeklySchedule>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let branch = service.set_schedule(branch_id, schedule).await?;
    Ok(Json(json!({
        "success": true,
        "branch": branch
    })))
}

pub async fn remove_branch_schedule(
    State(service): State<Arc<BranchService>>,
    Extension(user): Extension<User>,
    Path((branch_id, day)): Path<(Uuid, DayOfWeek)>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let branch = service.remove_schedule(branch_id, day).await?;
    Ok(Json(json!({
        "success": true,
        "branch": branch
    })))
}

pub async fn list_services(
    State(service): State<Arc<BranchService>>,
) -> Result<Json<Value>, AppError> {
    let services = service.list_services().await?;
    Ok(Json(json!({
        "services": services,
        "total": services.len()
    })))
}

pub async fn create_service(
    State(service): State<Arc<BranchService>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateServiceRequest>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let created = service.create_service(request).await?;
    Ok(Json(json!({
        "success": true,
        "service": created
    })))
}

pub async fn assign_branch_staff(
    State(service): State<Arc<BranchService>>,
    Extension(user): Extension<User>,
    Path(branch_id): Path<Uuid>,
    Json(request): Json<AssignStaffRequest>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;
    info!("Staff assignment to branch {} requested by user: {}", branch_id, user.id);

    let member = service.assign_staff(branch_id, request.user_id).await?;
    Ok(Json(json!({
        "success": true,
        "staff": member
    })))
}

pub async fn list_branch_staff(
    State(service): State<Arc<BranchService>>,
    Extension(user): Extension<User>,
    Path(branch_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let members = service.list_staff(branch_id).await?;
    Ok(Json(json!({
        "staff": members,
        "total": members.len()
    })))
}
