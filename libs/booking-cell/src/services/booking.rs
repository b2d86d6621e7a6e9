// libs/booking-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use branch_cell::{Branch, BranchDirectory, BranchError, BranchSummary, ScheduleCalendar, Service};
use shared_database::{Transaction, TransactionGate};
use shared_utils::clock::Clock;

use crate::error::BookingError;
use crate::models::{
    validate_display_name, Booking, BookingQuery, BookingStatus, BookingView,
    CreateBookingRequest, UpdateBookingRequest,
};
use crate::services::code::LookupCodeGenerator;
use crate::services::conflict::SlotConflictChecker;
use crate::services::lifecycle::{BookingLifecycle, StatusChange};
use crate::services::repository::BookingRepository;

pub struct BookingService {
    bookings: Arc<dyn BookingRepository>,
    branches: Arc<dyn BranchDirectory>,
    calendar: ScheduleCalendar,
    conflicts: SlotConflictChecker,
    lifecycle: BookingLifecycle,
    codes: LookupCodeGenerator,
    gate: Arc<TransactionGate>,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        branches: Arc<dyn BranchDirectory>,
        gate: Arc<TransactionGate>,
        clock: Arc<dyn Clock>,
        lookup_code_attempts: u32,
    ) -> Self {
        Self::with_code_generator(
            bookings,
            branches,
            gate,
            clock,
            LookupCodeGenerator::new(lookup_code_attempts),
        )
    }

    pub fn with_code_generator(
        bookings: Arc<dyn BookingRepository>,
        branches: Arc<dyn BranchDirectory>,
        gate: Arc<TransactionGate>,
        clock: Arc<dyn Clock>,
        codes: LookupCodeGenerator,
    ) -> Self {
        Self {
            conflicts: SlotConflictChecker::new(Arc::clone(&bookings)),
            bookings,
            branches,
            calendar: ScheduleCalendar::new(),
            lifecycle: BookingLifecycle::new(),
            codes,
            gate,
            clock,
        }
    }

    pub fn gate(&self) -> Arc<TransactionGate> {
        Arc::clone(&self.gate)
    }

    /// Books a slot for `requester`.
    ///
    /// The branch must be open at the meeting time and no other Waiting booking may
    /// hold the same (branch, service, meeting time). Check and insert happen under
    /// one transaction.
    pub async fn create(&self, request: CreateBookingRequest, requester: Uuid) -> Result<Booking, BookingError> {
        info!("Booking {} at branch {} for user {}", request.meeting_time, request.branch_id, requester);

        let display_name = validate_display_name(&request.display_name)?;
        let branch = self.load_branch(request.branch_id).await?;
        self.load_service(request.service_id).await?;

        let _tx = self.gate.begin("booking.create").await;

        self.ensure_bookable(&branch, request.service_id, request.meeting_time, None).await?;
        let lookup_code = self.codes.generate_unique(self.bookings.as_ref()).await?;

        let now = self.clock.now();
        let booking = Booking {
            id: Uuid::new_v4(),
            requester_id: Some(requester),
            display_name,
            branch_id: branch.id,
            service_id: request.service_id,
            meeting_time: request.meeting_time,
            lookup_code,
            status: BookingStatus::Waiting,
            created_at: now,
            updated_at: now,
        };

        let booking = self.bookings.insert(booking).await?;
        info!("Booking {} created with status {}", booking.id, booking.status);
        Ok(booking)
    }

    /// Full-field edit. Only Waiting bookings can be edited; the new slot is checked
    /// against every other Waiting booking.
    pub async fn update(&self, id: Uuid, request: UpdateBookingRequest) -> Result<Booking, BookingError> {
        let _tx = self.gate.begin("booking.update").await;

        let mut booking = self.get(id).await?;
        self.lifecycle.ensure_editable(booking.status)?;

        if let Some(name) = request.display_name.as_deref() {
            booking.display_name = validate_display_name(name)?;
        }
        let branch_id = request.branch_id.unwrap_or(booking.branch_id);
        let service_id = request.service_id.unwrap_or(booking.service_id);
        let meeting_time = request.meeting_time.unwrap_or(booking.meeting_time);

        let branch = self.load_branch(branch_id).await?;
        if service_id != booking.service_id {
            self.load_service(service_id).await?;
        }
        self.ensure_bookable(&branch, service_id, meeting_time, Some(booking.id)).await?;

        booking.branch_id = branch_id;
        booking.service_id = service_id;
        booking.meeting_time = meeting_time;
        booking.updated_at = self.clock.now();

        let booking = self.bookings.update(booking).await?;
        info!("Booking {} updated", booking.id);
        Ok(booking)
    }

    /// Status-only change; the slot is not re-validated.
    pub async fn update_status(&self, id: Uuid, status: BookingStatus) -> Result<Booking, BookingError> {
        let _tx = self.gate.begin("booking.status").await;

        let booking = self.get(id).await?;
        match self.lifecycle.validate_status_transition(booking.status, status)? {
            StatusChange::Unchanged => Ok(booking),
            StatusChange::Apply(next) => {
                let previous = booking.status;
                let booking = self.bookings.update(booking.with_status(next, self.clock.now())).await?;
                info!("Booking {} moved {} -> {}", booking.id, previous, booking.status);
                Ok(booking)
            }
        }
    }

    pub async fn cancel(&self, id: Uuid) -> Result<Booking, BookingError> {
        self.update_status(id, BookingStatus::Canceled).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Booking, BookingError> {
        self.bookings
            .get(id)
            .await?
            .ok_or_else(|| BookingError::BookingNotFound(id.to_string()))
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Booking, BookingError> {
        debug!("Looking up booking by code");
        self.bookings
            .find_by_code(code.trim())
            .await?
            .ok_or_else(|| BookingError::BookingNotFound(format!("code {}", code.trim())))
    }

    pub async fn list(&self, query: &BookingQuery) -> Result<Vec<Booking>, BookingError> {
        self.bookings.list(query).await
    }

    pub async fn view(&self, booking: Booking) -> Result<BookingView, BookingError> {
        let branch = self.load_branch(booking.branch_id).await?;
        let service = self.load_service(booking.service_id).await?;
        let is_open = self.calendar.is_open_now(&branch, self.clock.as_ref());
        Ok(BookingView {
            branch: BranchSummary::from_branch(&branch, is_open),
            service,
            booking,
        })
    }

    pub async fn views(&self, bookings: Vec<Booking>) -> Result<Vec<BookingView>, BookingError> {
        let mut views = Vec::with_capacity(bookings.len());
        for booking in bookings {
            views.push(self.view(booking).await?);
        }
        Ok(views)
    }

    /// Called when a user account is removed; bookings stay with no requester.
    pub async fn detach_user(&self, user_id: Uuid) -> Result<usize, BookingError> {
        let changed = self.bookings.detach_user(user_id, self.clock.now()).await?;
        info!("Detached user {} from {} bookings", user_id, changed);
        Ok(changed)
    }

    /// Waiting booking with the given code, read inside the caller's transaction.
    pub async fn find_waiting_by_code(&self, code: &str, _tx: &Transaction<'_>) -> Result<Booking, BookingError> {
        let code = code.trim();
        match self.bookings.find_by_code(code).await? {
            Some(booking) if booking.status == BookingStatus::Waiting => Ok(booking),
            _ => {
                warn!("No waiting booking for the presented code");
                Err(BookingError::BookingNotFound(format!("code {}", code)))
            }
        }
    }

    /// Marks a booking Completed once its visitor has been queued.
    pub async fn mark_completed(&self, booking: Booking, _tx: &Transaction<'_>) -> Result<Booking, BookingError> {
        match self.lifecycle.validate_status_transition(booking.status, BookingStatus::Completed)? {
            StatusChange::Unchanged => Ok(booking),
            StatusChange::Apply(next) => self.bookings.update(booking.with_status(next, self.clock.now())).await,
        }
    }

    async fn ensure_bookable(
        &self,
        branch: &Branch,
        service_id: Uuid,
        meeting_time: NaiveDateTime,
        excluding: Option<Uuid>,
    ) -> Result<(), BookingError> {
        if !self.calendar.is_open(branch, meeting_time) {
            warn!("Branch {} is closed at {}", branch.id, meeting_time);
            return Err(BookingError::BranchClosed {
                branch_id: branch.id,
                meeting_time,
            });
        }

        if self
            .conflicts
            .has_conflict(branch.id, service_id, meeting_time, excluding)
            .await?
        {
            return Err(BookingError::SlotTaken { meeting_time });
        }

        Ok(())
    }

    async fn load_branch(&self, id: Uuid) -> Result<Branch, BookingError> {
        self.branches
            .get_branch(id)
            .await?
            .ok_or(BookingError::Branch(BranchError::NotFound(id)))
    }

    async fn load_service(&self, id: Uuid) -> Result<Service, BookingError> {
        self.branches
            .get_service(id)
            .await?
            .ok_or(BookingError::Branch(BranchError::ServiceNotFound(id)))
    }
}
