use thiserror::Error;
use uuid::Uuid;

use crate::models::DayOfWeek;

#[derive(Error, Debug)]
pub enum BranchError {
    #[error("Branch not found: {0}")]
    NotFound(Uuid),

    #[error("Service not found: {0}")]
    ServiceNotFound(Uuid),

    #[error("User {0} is not assigned to any branch")]
    StaffNotFound(Uuid),

    #[error("Branch already has a schedule for {0}")]
    DuplicateWeekday(DayOfWeek),

    #[error("Service already exists: {0}")]
    DuplicateService(String),

    #[error("Invalid schedule for {day}: opens at {open_time} after closing at {close_time}")]
    InvalidSchedule {
        day: DayOfWeek,
        open_time: chrono::NaiveTime,
        close_time: chrono::NaiveTime,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<BranchError> for shared_models::error::AppError {
    fn from(e: BranchError) -> Self {
        use shared_models::error::AppError;
        match e {
            BranchError::NotFound(_) | BranchError::ServiceNotFound(_) | BranchError::StaffNotFound(_) => AppError::NotFound(e.to_string()),
            BranchError::DuplicateWeekday(_) | BranchError::DuplicateService(_) => AppError::Conflict(e.to_string()),
            BranchError::InvalidSchedule { .. } | BranchError::ValidationError(_) => {
                AppError::ValidationError(e.to_string())
            }
            BranchError::StorageError(msg) => AppError::Storage(msg),
        }
    }
}
