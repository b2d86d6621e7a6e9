use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use branch_cell::{BranchSummary, Service};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueTicket {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub service_id: Uuid,
    pub user_id: Option<Uuid>,
    /// Position in the day's pool; unique per `service_date` across all branches and kinds.
    pub value: u32,
    pub kind: TicketKind,
    pub status: TicketStatus,
    pub service_date: NaiveDate,
    pub booking_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl QueueTicket {
    /// Number shown on the display board, e.g. `S3` or `R12`.
    pub fn slug(&self) -> String {
        format!("{}{}", self.kind.prefix(), self.value)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TicketKind {
    WalkIn,
    FromBooking,
}

impl TicketKind {
    pub fn prefix(&self) -> char {
        match self {
            TicketKind::WalkIn => 'S',
            TicketKind::FromBooking => 'R',
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Waiting,
    InProgress,
    Completed,
}

impl TicketStatus {
    pub fn can_transition_to(&self, target: &TicketStatus) -> bool {
        use TicketStatus::*;
        matches!((self, target), (Waiting, InProgress) | (InProgress, Completed))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketStatus::Completed)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketStatus::Waiting => write!(f, "waiting"),
            TicketStatus::InProgress => write!(f, "in_progress"),
            TicketStatus::Completed => write!(f, "completed"),
        }
    }
}

// Request/response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkInRequest {
    pub branch_id: Uuid,
    pub service_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FromBookingRequest {
    pub lookup_code: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PullNextRequest {
    #[serde(default)]
    pub branch_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketQuery {
    pub branch_id: Option<Uuid>,
    pub status: Option<TicketStatus>,
}

impl TicketQuery {
    pub fn matches(&self, ticket: &QueueTicket) -> bool {
        self.branch_id.map_or(true, |id| ticket.branch_id == id)
            && self.status.map_or(true, |status| ticket.status == status)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketView {
    #[serde(flatten)]
    pub ticket: QueueTicket,
    pub slug: String,
    pub branch: BranchSummary,
    pub service: Service,
}
