use thiserror::Error;

use booking_cell::BookingError;
use branch_cell::BranchError;
use shared_database::RedisPoolError;
use shared_models::error::AppError;

use crate::models::TicketStatus;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("No waiting booking found for {0}")]
    BookingNotFound(String),

    #[error("Ticket not found: {0}")]
    TicketNotFound(String),

    #[error("Invalid ticket status transition from {from} to {to}")]
    InvalidState { from: TicketStatus, to: TicketStatus },

    #[error(transparent)]
    Booking(BookingError),

    #[error(transparent)]
    Branch(#[from] BranchError),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Redis connection error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Redis pool error: {0}")]
    RedisPoolError(#[from] RedisPoolError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<BookingError> for QueueError {
    fn from(e: BookingError) -> Self {
        match e {
            BookingError::BookingNotFound(what) => QueueError::BookingNotFound(what),
            BookingError::Branch(inner) => QueueError::Branch(inner),
            other => QueueError::Booking(other),
        }
    }
}

impl From<QueueError> for AppError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::BookingNotFound(_) | QueueError::TicketNotFound(_) => {
                AppError::NotFound(e.to_string())
            }
            QueueError::InvalidState { .. } => AppError::Conflict(e.to_string()),
            QueueError::Booking(inner) => inner.into(),
            QueueError::Branch(inner) => inner.into(),
            QueueError::StorageError(msg) => AppError::Storage(msg),
            QueueError::RedisError(_)
            | QueueError::RedisPoolError(_)
            | QueueError::SerializationError(_) => AppError::Storage(e.to_string()),
        }
    }
}
