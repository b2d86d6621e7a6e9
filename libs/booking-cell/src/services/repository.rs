// libs/booking-cell/src/services/repository.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::BookingError;
use crate::models::{Booking, BookingQuery, StaffBooking, StaffBookingQuery};

/// Storage seam for bookings. Bookings are never physically removed.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert(&self, booking: Booking) -> Result<Booking, BookingError>;
    async fn update(&self, booking: Booking) -> Result<Booking, BookingError>;
    async fn get(&self, id: Uuid) -> Result<Option<Booking>, BookingError>;
    async fn find_by_code(&self, code: &str) -> Result<Option<Booking>, BookingError>;
    async fn code_exists(&self, code: &str) -> Result<bool, BookingError>;
    /// Waiting bookings holding the given slot.
    async fn find_waiting_in_slot(
        &self,
        branch_id: Uuid,
        service_id: Uuid,
        meeting_time: NaiveDateTime,
    ) -> Result<Vec<Booking>, BookingError>;
    async fn list(&self, query: &BookingQuery) -> Result<Vec<Booking>, BookingError>;
    /// Clears the requester on every booking of the user; returns how many changed.
    async fn detach_user(&self, user_id: Uuid, now: NaiveDateTime) -> Result<usize, BookingError>;
}

#[derive(Default)]
pub struct InMemoryBookingRepository {
    bookings: RwLock<HashMap<Uuid, Booking>>,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn insert(&self, booking: Booking) -> Result<Booking, BookingError> {
        let mut bookings = self.bookings.write().await;
        if bookings.contains_key(&booking.id) {
            return Err(BookingError::StorageError(format!("Booking {} already exists", booking.id)));
        }
        bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn update(&self, booking: Booking) -> Result<Booking, BookingError> {
        let mut bookings = self.bookings.write().await;
        match bookings.get_mut(&booking.id) {
            Some(existing) => {
                *existing = booking.clone();
                Ok(booking)
            }
            None => Err(BookingError::BookingNotFound(booking.id.to_string())),
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, BookingError> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Booking>, BookingError> {
        let bookings = self.bookings.read().await;
        Ok(bookings.values().find(|b| b.lookup_code == code).cloned())
    }

    async fn code_exists(&self, code: &str) -> Result<bool, BookingError> {
        let bookings = self.bookings.read().await;
        Ok(bookings.values().any(|b| b.lookup_code == code))
    }

    async fn find_waiting_in_slot(
        &self,
        branch_id: Uuid,
        service_id: Uuid,
        meeting_time: NaiveDateTime,
    ) -> Result<Vec<Booking>, BookingError> {
        let bookings = self.bookings.read().await;
        let found: Vec<Booking> = bookings
            .values()
            .filter(|b| b.occupies(branch_id, service_id, meeting_time))
            .cloned()
            .collect();
        debug!("Slot {} / {} / {} holds {} waiting bookings", branch_id, service_id, meeting_time, found.len());
        Ok(found)
    }

    async fn list(&self, query: &BookingQuery) -> Result<Vec<Booking>, BookingError> {
        let bookings = self.bookings.read().await;
        let mut found: Vec<Booking> = bookings.values().filter(|b| query.matches(b)).cloned().collect();
        found.sort_by(|a, b| a.meeting_time.cmp(&b.meeting_time).then(a.created_at.cmp(&b.created_at)));
        Ok(found)
    }

    async fn detach_user(&self, user_id: Uuid, now: NaiveDateTime) -> Result<usize, BookingError> {
        let mut bookings = self.bookings.write().await;
        let mut changed = 0;
        for booking in bookings.values_mut().filter(|b| b.requester_id == Some(user_id)) {
            booking.requester_id = None;
            booking.updated_at = now;
            changed += 1;
        }
        Ok(changed)
    }
}

/// Storage seam for meetings with a named employee.
#[async_trait]
pub trait StaffBookingRepository: Send + Sync {
    async fn insert(&self, booking: StaffBooking) -> Result<StaffBooking, BookingError>;
    async fn update(&self, booking: StaffBooking) -> Result<StaffBooking, BookingError>;
    async fn get(&self, id: Uuid) -> Result<Option<StaffBooking>, BookingError>;
    /// Waiting meetings the employee has at `meeting_time`.
    async fn find_waiting_for_staff(
        &self,
        staff_id: Uuid,
        meeting_time: NaiveDateTime,
    ) -> Result<Vec<StaffBooking>, BookingError>;
    async fn list(&self, query: &StaffBookingQuery) -> Result<Vec<StaffBooking>, BookingError>;
    async fn detach_user(&self, user_id: Uuid, now: NaiveDateTime) -> Result<usize, BookingError>;
}

#[derive(Default)]
pub struct InMemoryStaffBookingRepository {
    bookings: RwLock<HashMap<Uuid, StaffBooking>>,
}

impl InMemoryStaffBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StaffBookingRepository for InMemoryStaffBookingRepository {
    async fn insert(&self, booking: StaffBooking) -> Result<StaffBooking, BookingError> {
        let mut bookings = self.bookings.write().await;
        if bookings.contains_key(&booking.id) {
            return Err(BookingError::StorageError(format!("Staff booking {} already exists", booking.id)));
        }
        bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn update(&self, booking: StaffBooking) -> Result<StaffBooking, BookingError> {
        let mut bookings = self.bookings.write().await;
        match bookings.get_mut(&booking.id) {
            Some(existing) => {
                *existing = booking.clone();
                Ok(booking)
            }
            None => Err(BookingError::BookingNotFound(booking.id.to_string())),
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<StaffBooking>, BookingError> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn find_waiting_for_staff(
        &self,
        staff_id: Uuid,
        meeting_time: NaiveDateTime,
    ) -> Result<Vec<StaffBooking>, BookingError> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .values()
            .filter(|b| b.occupies(staff_id, meeting_time))
            .cloned()
            .collect())
    }

    async fn list(&self, query: &StaffBookingQuery) -> Result<Vec<StaffBooking>, BookingError> {
        let bookings = self.bookings.read().await;
        let mut found: Vec<StaffBooking> = bookings.values().filter(|b| query.matches(b)).cloned().collect();
        found.sort_by(|a, b| a.meeting_time.cmp(&b.meeting_time).then(a.created_at.cmp(&b.created_at)));
        Ok(found)
    }

    async fn detach_user(&self, user_id: Uuid, now: NaiveDateTime) -> Result<usize, BookingError> {
        let mut bookings = self.bookings.write().await;
        let mut changed = 0;
        for booking in bookings.values_mut().filter(|b| b.requester_id == Some(user_id)) {
            booking.requester_id = None;
            booking.updated_at = now;
            changed += 1;
        }
        Ok(changed)
    }
}
