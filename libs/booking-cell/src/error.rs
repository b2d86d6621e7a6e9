use chrono::NaiveDateTime;
use thiserror::Error;
use uuid::Uuid;

use branch_cell::BranchError;
use shared_models::error::AppError;

use crate::models::BookingStatus;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Branch {branch_id} is closed at {meeting_time}")]
    BranchClosed {
        branch_id: Uuid,
        meeting_time: NaiveDateTime,
    },

    #[error("{} at {} is already booked at this branch", .meeting_time.date(), .meeting_time.time())]
    SlotTaken { meeting_time: NaiveDateTime },

    #[error("Staff member {staff_id} already has a meeting at {meeting_time}")]
    StaffUnavailable {
        staff_id: Uuid,
        meeting_time: NaiveDateTime,
    },

    #[error("Staff member {staff_id} does not work at branch {branch_id}")]
    StaffNotAtBranch { staff_id: Uuid, branch_id: Uuid },

    #[error("Booking not found: {0}")]
    BookingNotFound(String),

    #[error("Booking is {status}, cannot {action}")]
    InvalidState {
        status: BookingStatus,
        action: String,
    },

    #[error("Could not generate a free lookup code after {attempts} attempts")]
    CodeGenerationExhausted { attempts: u32 },

    #[error(transparent)]
    Branch(#[from] BranchError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<BookingError> for AppError {
    fn from(e: BookingError) -> Self {
        match e {
            BookingError::BranchClosed { .. }
            | BookingError::StaffNotAtBranch { .. }
            | BookingError::ValidationError(_) => {
                AppError::ValidationError(e.to_string())
            }
            BookingError::SlotTaken { .. }
            | BookingError::StaffUnavailable { .. }
            | BookingError::InvalidState { .. } => {
                AppError::Conflict(e.to_string())
            }
            BookingError::BookingNotFound(_) => AppError::NotFound(e.to_string()),
            BookingError::Branch(inner) => inner.into(),
            BookingError::CodeGenerationExhausted { .. } => AppError::Storage(e.to_string()),
            BookingError::StorageError(msg) => AppError::Storage(msg),
        }
    }
}
