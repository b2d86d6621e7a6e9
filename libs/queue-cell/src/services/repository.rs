use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::QueueError;
use crate::models::{QueueTicket, TicketQuery, TicketStatus};

/// Storage seam for queue tickets.
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Next ticket number for `date`: tickets already issued that day plus one.
    async fn allocate_value(&self, date: NaiveDate) -> Result<u32, QueueError>;
    async fn insert(&self, ticket: QueueTicket) -> Result<QueueTicket, QueueError>;
    async fn update(&self, ticket: QueueTicket) -> Result<QueueTicket, QueueError>;
    async fn get(&self, id: Uuid) -> Result<Option<QueueTicket>, QueueError>;
    /// Drops a ticket that was issued in a check-in that could not finish.
    async fn remove(&self, ticket: &QueueTicket) -> Result<(), QueueError>;
    /// Claims the lowest-numbered Waiting ticket of `date`, optionally within one
    /// branch, and moves it to InProgress.
    async fn take_next_waiting(
        &self,
        date: NaiveDate,
        branch_id: Option<Uuid>,
        now: NaiveDateTime,
    ) -> Result<Option<QueueTicket>, QueueError>;
    /// Tickets of `date` ordered by value.
    async fn list(&self, date: NaiveDate, query: &TicketQuery) -> Result<Vec<QueueTicket>, QueueError>;
    async fn detach_user(&self, user_id: Uuid, now: NaiveDateTime) -> Result<usize, QueueError>;
}

/// Process-local ticket pool. Callers hold the queue transaction around
/// `allocate_value` + `insert`.
#[derive(Default)]
pub struct InMemoryTicketRepository {
    tickets: RwLock<HashMap<Uuid, QueueTicket>>,
}

impl InMemoryTicketRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TicketRepository for InMemoryTicketRepository {
    async fn allocate_value(&self, date: NaiveDate) -> Result<u32, QueueError> {
        let tickets = self.tickets.read().await;
        let issued = tickets.values().filter(|t| t.service_date == date).count();
        let value = u32::try_from(issued + 1)
            .map_err(|_| QueueError::StorageError(format!("Ticket counter overflow for {}", date)))?;
        debug!("Allocated ticket value {} for {}", value, date);
        Ok(value)
    }

    async fn insert(&self, ticket: QueueTicket) -> Result<QueueTicket, QueueError> {
        let mut tickets = self.tickets.write().await;
        if tickets.contains_key(&ticket.id) {
            return Err(QueueError::StorageError(format!("Ticket {} already exists", ticket.id)));
        }
        tickets.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn update(&self, ticket: QueueTicket) -> Result<QueueTicket, QueueError> {
        let mut tickets = self.tickets.write().await;
        match tickets.get_mut(&ticket.id) {
            Some(existing) => {
                *existing = ticket.clone();
                Ok(ticket)
            }
            None => Err(QueueError::TicketNotFound(ticket.id.to_string())),
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<QueueTicket>, QueueError> {
        Ok(self.tickets.read().await.get(&id).cloned())
    }

    async fn remove(&self, ticket: &QueueTicket) -> Result<(), QueueError> {
        self.tickets.write().await.remove(&ticket.id);
        Ok(())
    }

    async fn take_next_waiting(
        &self,
        date: NaiveDate,
        branch_id: Option<Uuid>,
        now: NaiveDateTime,
    ) -> Result<Option<QueueTicket>, QueueError> {
        let mut tickets = self.tickets.write().await;
        let next = tickets
            .values_mut()
            .filter(|t| t.service_date == date && t.status == TicketStatus::Waiting)
            .filter(|t| branch_id.map_or(true, |id| t.branch_id == id))
            .min_by_key(|t| t.value);

        Ok(next.map(|ticket| {
            ticket.status = TicketStatus::InProgress;
            ticket.updated_at = now;
            ticket.clone()
        }))
    }

    async fn list(&self, date: NaiveDate, query: &TicketQuery) -> Result<Vec<QueueTicket>, QueueError> {
        let tickets = self.tickets.read().await;
        let mut found: Vec<QueueTicket> = tickets
            .values()
            .filter(|t| t.service_date == date && query.matches(t))
            .cloned()
            .collect();
        found.sort_by_key(|t| t.value);
        Ok(found)
    }

    async fn detach_user(&self, user_id: Uuid, now: NaiveDateTime) -> Result<usize, QueueError> {
        let mut tickets = self.tickets.write().await;
        let mut changed = 0;
        for ticket in tickets.values_mut().filter(|t| t.user_id == Some(user_id)) {
            ticket.user_id = None;
            ticket.updated_at = now;
            changed += 1;
        }
        Ok(changed)
    }
}
