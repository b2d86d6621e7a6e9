// libs/booking-cell/src/services/staff.rs
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use branch_cell::{Branch, BranchDirectory, BranchError, ScheduleCalendar};
use shared_database::TransactionGate;
use shared_utils::clock::Clock;

use crate::error::BookingError;
use crate::models::{validate_display_name, BookingStatus, CreateStaffBookingRequest, StaffBooking, StaffBookingQuery};
use crate::services::lifecycle::{BookingLifecycle, StatusChange};
use crate::services::repository::StaffBookingRepository;

/// Meetings with a specific employee. The employee must be assigned to the
/// booked branch and may hold one Waiting meeting per meeting time.
pub struct StaffBookingService {
    bookings: Arc<dyn StaffBookingRepository>,
    branches: Arc<dyn BranchDirectory>,
    calendar: ScheduleCalendar,
    lifecycle: BookingLifecycle,
    gate: Arc<TransactionGate>,
    clock: Arc<dyn Clock>,
}

impl StaffBookingService {
    pub fn new(
        bookings: Arc<dyn StaffBookingRepository>,
        branches: Arc<dyn BranchDirectory>,
        gate: Arc<TransactionGate>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            bookings,
            branches,
            calendar: ScheduleCalendar::new(),
            lifecycle: BookingLifecycle::new(),
            gate,
            clock,
        }
    }

    pub async fn create(
        &self,
        request: CreateStaffBookingRequest,
        requester: Uuid,
    ) -> Result<StaffBooking, BookingError> {
        info!(
            "Staff meeting with {} at {} requested by user {}",
            request.staff_id, request.meeting_time, requester
        );

        let display_name = validate_display_name(&request.display_name)?;
        let branch = self.load_branch(request.branch_id).await?;

        let works_here = self
            .branches
            .get_staff(request.staff_id)
            .await?
            .is_some_and(|member| member.works_at(branch.id));
        if !works_here {
            warn!("Staff {} is not assigned to branch {}", request.staff_id, branch.id);
            return Err(BookingError::StaffNotAtBranch {
                staff_id: request.staff_id,
                branch_id: branch.id,
            });
        }

        if !self.calendar.is_open(&branch, request.meeting_time) {
            return Err(BookingError::BranchClosed {
                branch_id: branch.id,
                meeting_time: request.meeting_time,
            });
        }

        let _tx = self.gate.begin("staff_booking.create").await;

        let taken = self
            .bookings
            .find_waiting_for_staff(request.staff_id, request.meeting_time)
            .await?;
        if !taken.is_empty() {
            warn!("Staff {} is busy at {}", request.staff_id, request.meeting_time);
            return Err(BookingError::StaffUnavailable {
                staff_id: request.staff_id,
                meeting_time: request.meeting_time,
            });
        }

        let now = self.clock.now();
        let booking = StaffBooking {
            id: Uuid::new_v4(),
            requester_id: Some(requester),
            display_name,
            branch_id: branch.id,
            staff_id: request.staff_id,
            meeting_time: request.meeting_time,
            status: BookingStatus::Waiting,
            created_at: now,
            updated_at: now,
        };

        let booking = self.bookings.insert(booking).await?;
        info!("Staff booking {} created", booking.id);
        Ok(booking)
    }

    pub async fn update_status(&self, id: Uuid, status: BookingStatus) -> Result<StaffBooking, BookingError> {
        let _tx = self.gate.begin("staff_booking.status").await;

        let booking = self.get(id).await?;
        match self.lifecycle.validate_status_transition(booking.status, status)? {
            StatusChange::Unchanged => Ok(booking),
            StatusChange::Apply(next) => {
                let previous = booking.status;
                let booking = self.bookings.update(booking.with_status(next, self.clock.now())).await?;
                info!("Staff booking {} moved {} -> {}", booking.id, previous, booking.status);
                Ok(booking)
            }
        }
    }

    pub async fn cancel(&self, id: Uuid) -> Result<StaffBooking, BookingError> {
        self.update_status(id, BookingStatus::Canceled).await
    }

    pub async fn get(&self, id: Uuid) -> Result<StaffBooking, BookingError> {
        self.bookings
            .get(id)
            .await?
            .ok_or_else(|| BookingError::BookingNotFound(id.to_string()))
    }

    pub async fn list(&self, query: &StaffBookingQuery) -> Result<Vec<StaffBooking>, BookingError> {
        self.bookings.list(query).await
    }

    pub async fn detach_user(&self, user_id: Uuid) -> Result<usize, BookingError> {
        let changed = self.bookings.detach_user(user_id, self.clock.now()).await?;
        info!("Detached user {} from {} staff bookings", user_id, changed);
        Ok(changed)
    }

    async fn load_branch(&self, id: Uuid) -> Result<Branch, BookingError> {
        self.branches
            .get_branch(id)
            .await?
            .ok_or(BookingError::Branch(BranchError::NotFound(id)))
    }
}
