use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use booking_cell::BookingService;
use branch_cell::{Branch, BranchDirectory, BranchError, BranchSummary, ScheduleCalendar, Service};
use shared_database::TransactionGate;
use shared_utils::clock::Clock;

use crate::error::QueueError;
use crate::models::{QueueTicket, TicketKind, TicketQuery, TicketStatus, TicketView};
use crate::services::repository::TicketRepository;

/// Issues same-day ticket numbers and moves tickets through
/// Waiting -> InProgress -> Completed.
///
/// "Today" is read from the clock on every call, so numbering restarts on the
/// first ticket of a new local day without any scheduled job.
pub struct QueueSequencer {
    tickets: Arc<dyn TicketRepository>,
    bookings: Arc<BookingService>,
    branches: Arc<dyn BranchDirectory>,
    calendar: ScheduleCalendar,
    gate: Arc<TransactionGate>,
    clock: Arc<dyn Clock>,
}

impl QueueSequencer {
    /// Shares the booking service's transaction gate so consuming a booking and
    /// issuing its ticket cannot interleave with booking edits.
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        bookings: Arc<BookingService>,
        branches: Arc<dyn BranchDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            gate: bookings.gate(),
            tickets,
            bookings,
            branches,
            calendar: ScheduleCalendar::new(),
            clock,
        }
    }

    pub async fn enqueue_walk_in(
        &self,
        branch_id: Uuid,
        service_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<QueueTicket, QueueError> {
        self.load_branch(branch_id).await?;
        self.load_service(service_id).await?;

        let _tx = self.gate.begin("queue.walk_in").await;
        let ticket = self
            .issue(branch_id, service_id, user_id, TicketKind::WalkIn, None)
            .await?;

        info!("Issued walk-in ticket {} at branch {}", ticket.slug(), branch_id);
        Ok(ticket)
    }

    /// Converts a Waiting booking into a ticket and completes the booking.
    /// A code can be converted only once.
    pub async fn enqueue_from_booking(&self, lookup_code: &str) -> Result<QueueTicket, QueueError> {
        let tx = self.gate.begin("queue.from_booking").await;

        let booking = self.bookings.find_waiting_by_code(lookup_code, &tx).await?;
        let booking_id = booking.id;
        let ticket = self
            .issue(
                booking.branch_id,
                booking.service_id,
                booking.requester_id,
                TicketKind::FromBooking,
                Some(booking_id),
            )
            .await?;
        if let Err(e) = self.bookings.mark_completed(booking, &tx).await {
            warn!("Could not complete booking {}, withdrawing ticket {}: {}", booking_id, ticket.slug(), e);
            self.tickets.remove(&ticket).await?;
            return Err(e.into());
        }

        info!("Booking {} checked in as ticket {}", booking_id, ticket.slug());
        Ok(ticket)
    }

    /// Moves the lowest-numbered Waiting ticket of today to InProgress.
    pub async fn pull_next(&self, branch_id: Option<Uuid>) -> Result<Option<QueueTicket>, QueueError> {
        let _tx = self.gate.begin("queue.pull_next").await;

        let today = self.clock.today();
        let next = self
            .tickets
            .take_next_waiting(today, branch_id, self.clock.now())
            .await?;

        match &next {
            Some(ticket) => info!("Serving ticket {} at branch {}", ticket.slug(), ticket.branch_id),
            None => debug!("No waiting tickets for {}", today),
        }
        Ok(next)
    }

    /// Serves the next ticket for a teller. Without an explicit branch the teller's
    /// assigned branch is used; unassigned tellers serve the whole day's pool.
    pub async fn pull_next_for(
        &self,
        teller_id: Uuid,
        branch_id: Option<Uuid>,
    ) -> Result<Option<QueueTicket>, QueueError> {
        let branch_id = match branch_id {
            Some(id) => Some(id),
            None => self.branches.get_staff(teller_id).await?.map(|member| member.branch_id),
        };
        self.pull_next(branch_id).await
    }

    pub async fn complete(&self, ticket_id: Uuid) -> Result<QueueTicket, QueueError> {
        let _tx = self.gate.begin("queue.complete").await;

        let mut ticket = self.get(ticket_id).await?;
        if !ticket.status.can_transition_to(&TicketStatus::Completed) {
            warn!("Ticket {} cannot complete from {}", ticket.slug(), ticket.status);
            return Err(QueueError::InvalidState {
                from: ticket.status,
                to: TicketStatus::Completed,
            });
        }

        ticket.status = TicketStatus::Completed;
        ticket.updated_at = self.clock.now();
        let ticket = self.tickets.update(ticket).await?;

        info!("Ticket {} completed", ticket.slug());
        Ok(ticket)
    }

    pub async fn get(&self, ticket_id: Uuid) -> Result<QueueTicket, QueueError> {
        self.tickets
            .get(ticket_id)
            .await?
            .ok_or_else(|| QueueError::TicketNotFound(ticket_id.to_string()))
    }

    pub async fn list_today(&self, query: &TicketQuery) -> Result<Vec<QueueTicket>, QueueError> {
        self.tickets.list(self.clock.today(), query).await
    }

    pub async fn detach_user(&self, user_id: Uuid) -> Result<usize, QueueError> {
        let changed = self.tickets.detach_user(user_id, self.clock.now()).await?;
        info!("Detached user {} from {} tickets", user_id, changed);
        Ok(changed)
    }

    pub async fn view(&self, ticket: QueueTicket) -> Result<TicketView, QueueError> {
        let branch = self.load_branch(ticket.branch_id).await?;
        let service = self.load_service(ticket.service_id).await?;
        let is_open = self.calendar.is_open_now(&branch, self.clock.as_ref());
        Ok(TicketView {
            slug: ticket.slug(),
            branch: BranchSummary::from_branch(&branch, is_open),
            service,
            ticket,
        })
    }

    pub async fn views(&self, tickets: Vec<QueueTicket>) -> Result<Vec<TicketView>, QueueError> {
        let mut views = Vec::with_capacity(tickets.len());
        for ticket in tickets {
            views.push(self.view(ticket).await?);
        }
        Ok(views)
    }

    // Caller holds the gate.
    async fn issue(
        &self,
        branch_id: Uuid,
        service_id: Uuid,
        user_id: Option<Uuid>,
        kind: TicketKind,
        booking_id: Option<Uuid>,
    ) -> Result<QueueTicket, QueueError> {
        let now = self.clock.now();
        let service_date = now.date();
        let value = self.tickets.allocate_value(service_date).await?;

        let ticket = QueueTicket {
            id: Uuid::new_v4(),
            branch_id,
            service_id,
            user_id,
            value,
            kind,
            status: TicketStatus::Waiting,
            service_date,
            booking_id,
            created_at: now,
            updated_at: now,
        };
        self.tickets.insert(ticket).await
    }

    async fn load_branch(&self, id: Uuid) -> Result<Branch, QueueError> {
        self.branches
            .get_branch(id)
            .await?
            .ok_or(QueueError::Branch(BranchError::NotFound(id)))
    }

    async fn load_service(&self, id: Uuid) -> Result<Service, QueueError> {
        self.branches
            .get_service(id)
            .await?
            .ok_or(QueueError::Branch(BranchError::ServiceNotFound(id)))
    }
}
