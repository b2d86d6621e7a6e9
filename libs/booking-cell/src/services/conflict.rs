// libs/booking-cell/src/services/conflict.rs
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::BookingError;
use crate::services::repository::BookingRepository;

/// Answers whether a (branch, service, meeting time) slot is already held by a
/// Waiting booking. Callers hold the booking transaction across check and write.
pub struct SlotConflictChecker {
    bookings: Arc<dyn BookingRepository>,
}

impl SlotConflictChecker {
    pub fn new(bookings: Arc<dyn BookingRepository>) -> Self {
        Self { bookings }
    }

    pub async fn has_conflict(
        &self,
        branch_id: Uuid,
        service_id: Uuid,
        meeting_time: NaiveDateTime,
        excluding: Option<Uuid>,
    ) -> Result<bool, BookingError> {
        debug!("Checking slot {} / {} at {}", branch_id, service_id, meeting_time);

        let holders = self
            .bookings
            .find_waiting_in_slot(branch_id, service_id, meeting_time)
            .await?;

        let conflict = holders
            .iter()
            .any(|booking| Some(booking.id) != excluding);

        if conflict {
            warn!("Slot conflict at branch {} for {}", branch_id, meeting_time);
        }
        Ok(conflict)
    }
}
