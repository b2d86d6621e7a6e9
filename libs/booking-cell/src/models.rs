// libs/booking-cell/src/models.rs
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use branch_cell::{BranchSummary, Service};

use crate::error::BookingError;

pub const LOOKUP_CODE_LENGTH: usize = 10;
pub const MAX_DISPLAY_NAME_LENGTH: usize = 100;

// ==============================================================================
// CORE BOOKING MODELS
// ==============================================================================

/// A reserved branch visit for one service at one meeting time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    /// Cleared when the user account is deleted; the booking itself stays.
    pub requester_id: Option<Uuid>,
    pub display_name: String,
    pub branch_id: Uuid,
    pub service_id: Uuid,
    pub meeting_time: NaiveDateTime,
    pub lookup_code: String,
    pub status: BookingStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    pub fn occupies(&self, branch_id: Uuid, service_id: Uuid, meeting_time: NaiveDateTime) -> bool {
        self.status.holds_slot()
            && self.branch_id == branch_id
            && self.service_id == service_id
            && self.meeting_time == meeting_time
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.requester_id == Some(user_id)
    }

    pub fn with_status(mut self, status: BookingStatus, now: NaiveDateTime) -> Self {
        self.status = status;
        self.updated_at = now;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Waiting,
    Canceled,
    Completed,
}

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Canceled | BookingStatus::Completed)
    }

    /// Only Waiting bookings occupy their (branch, service, meeting time) slot.
    pub fn holds_slot(&self) -> bool {
        matches!(self, BookingStatus::Waiting)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Waiting => write!(f, "waiting"),
            BookingStatus::Canceled => write!(f, "canceled"),
            BookingStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A meeting with one named employee of a branch. Follows the same lifecycle as
/// [`Booking`] but is never checked in through the queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StaffBooking {
    pub id: Uuid,
    pub requester_id: Option<Uuid>,
    pub display_name: String,
    pub branch_id: Uuid,
    /// User id of the employee being met.
    pub staff_id: Uuid,
    pub meeting_time: NaiveDateTime,
    pub status: BookingStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl StaffBooking {
    pub fn occupies(&self, staff_id: Uuid, meeting_time: NaiveDateTime) -> bool {
        self.status.holds_slot() && self.staff_id == staff_id && self.meeting_time == meeting_time
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.requester_id == Some(user_id)
    }

    pub fn with_status(mut self, status: BookingStatus, now: NaiveDateTime) -> Self {
        self.status = status;
        self.updated_at = now;
        self
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub branch_id: Uuid,
    pub service_id: Uuid,
    pub meeting_time: NaiveDateTime,
    pub display_name: String,
}

/// Full-field edit of a Waiting booking. Omitted fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBookingRequest {
    pub branch_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub meeting_time: Option<NaiveDateTime>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingQuery {
    pub requester_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
}

impl BookingQuery {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.requester_id.map_or(true, |id| booking.requester_id == Some(id))
            && self.branch_id.map_or(true, |id| booking.branch_id == id)
            && self.service_id.map_or(true, |id| booking.service_id == id)
            && self.status.map_or(true, |status| booking.status == status)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStaffBookingRequest {
    pub branch_id: Uuid,
    pub staff_id: Uuid,
    pub meeting_time: NaiveDateTime,
    pub display_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaffBookingQuery {
    pub requester_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub staff_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
}

impl StaffBookingQuery {
    pub fn matches(&self, booking: &StaffBooking) -> bool {
        self.requester_id.map_or(true, |id| booking.requester_id == Some(id))
            && self.branch_id.map_or(true, |id| booking.branch_id == id)
            && self.staff_id.map_or(true, |id| booking.staff_id == id)
            && self.status.map_or(true, |status| booking.status == status)
    }
}

/// Booking as presented to clients and staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub branch: BranchSummary,
    pub service: Service,
}

pub fn validate_display_name(name: &str) -> Result<String, BookingError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(BookingError::ValidationError("Display name is required".to_string()));
    }
    if trimmed.chars().count() > MAX_DISPLAY_NAME_LENGTH {
        return Err(BookingError::ValidationError(format!(
            "Display name must be at most {} characters",
            MAX_DISPLAY_NAME_LENGTH
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::NaiveDate;

    fn booking(status: BookingStatus) -> Booking {
        let at = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(10, 0, 0).unwrap();
        Booking {
            id: Uuid::new_v4(),
            requester_id: Some(Uuid::new_v4()),
            display_name: "Aibek Toktogulov".to_string(),
            branch_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            meeting_time: at,
            lookup_code: "0123456789".to_string(),
            status,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_only_waiting_bookings_occupy_slot() {
        let waiting = booking(BookingStatus::Waiting);
        assert!(waiting.occupies(waiting.branch_id, waiting.service_id, waiting.meeting_time));
        assert!(!waiting.occupies(Uuid::new_v4(), waiting.service_id, waiting.meeting_time));

        let canceled = booking(BookingStatus::Canceled);
        assert!(!canceled.occupies(canceled.branch_id, canceled.service_id, canceled.meeting_time));
    }

    #[test]
    fn test_query_matches_on_every_given_field() {
        let b = booking(BookingStatus::Waiting);
        assert!(BookingQuery::default().matches(&b));
        assert!(BookingQuery { branch_id: Some(b.branch_id), status: Some(BookingStatus::Waiting), ..Default::default() }.matches(&b));
        assert!(!BookingQuery { status: Some(BookingStatus::Completed), ..Default::default() }.matches(&b));
        assert!(!BookingQuery { requester_id: Some(Uuid::new_v4()), ..Default::default() }.matches(&b));
    }

    #[test]
    fn test_staff_booking_slot_is_per_employee() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(11, 0, 0).unwrap();
        let booking = StaffBooking {
            id: Uuid::new_v4(),
            requester_id: None,
            display_name: "Nurlan".to_string(),
            branch_id: Uuid::new_v4(),
            staff_id: Uuid::new_v4(),
            meeting_time: at,
            status: BookingStatus::Waiting,
            created_at: at,
            updated_at: at,
        };
        assert!(booking.occupies(booking.staff_id, at));
        assert!(!booking.occupies(Uuid::new_v4(), at));
        assert!(!booking.clone().with_status(BookingStatus::Canceled, at).occupies(booking.staff_id, at));
        assert!(StaffBookingQuery { staff_id: Some(booking.staff_id), ..Default::default() }.matches(&booking));
    }

    #[test]
    fn test_display_name_validation() {
        assert_eq!(validate_display_name("  Aida  ").unwrap(), "Aida");
        assert_matches!(validate_display_name(""), Err(BookingError::ValidationError(_)));
        assert_matches!(validate_display_name(&"x".repeat(101)), Err(BookingError::ValidationError(_)));
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&BookingStatus::Canceled).unwrap(), "\"canceled\"");
        assert!(BookingStatus::Completed.is_terminal());
        assert!(!BookingStatus::Waiting.is_terminal());
    }
}
