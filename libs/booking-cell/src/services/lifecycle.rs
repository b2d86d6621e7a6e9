// libs/booking-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::error::BookingError;
use crate::models::BookingStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// Requested status equals the current one; nothing to write.
    Unchanged,
    Apply(BookingStatus),
}

/// Waiting -> Completed | Canceled. Both targets are terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct BookingLifecycle;

impl BookingLifecycle {
    pub fn new() -> Self {
        Self
    }

    pub fn valid_transitions(&self, current: BookingStatus) -> Vec<BookingStatus> {
        match current {
            BookingStatus::Waiting => vec![BookingStatus::Completed, BookingStatus::Canceled],
            // Terminal states - no transitions allowed
            BookingStatus::Completed => vec![],
            BookingStatus::Canceled => vec![],
        }
    }

    pub fn validate_status_transition(
        &self,
        current: BookingStatus,
        requested: BookingStatus,
    ) -> Result<StatusChange, BookingError> {
        if current == requested {
            debug!("Booking already {}, nothing to change", current);
            return Ok(StatusChange::Unchanged);
        }

        if !self.valid_transitions(current).contains(&requested) {
            warn!("Invalid booking status transition attempted: {} -> {}", current, requested);
            return Err(BookingError::InvalidState {
                status: current,
                action: format!("move to {}", requested),
            });
        }

        Ok(StatusChange::Apply(requested))
    }

    /// Field edits are only allowed while the booking still holds its slot.
    pub fn ensure_editable(&self, current: BookingStatus) -> Result<(), BookingError> {
        if current.is_terminal() {
            return Err(BookingError::InvalidState {
                status: current,
                action: "edit booking details".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_waiting_can_complete_or_cancel() {
        let lifecycle = BookingLifecycle::new();
        assert_eq!(
            lifecycle.validate_status_transition(BookingStatus::Waiting, BookingStatus::Completed).unwrap(),
            StatusChange::Apply(BookingStatus::Completed)
        );
        assert_eq!(
            lifecycle.validate_status_transition(BookingStatus::Waiting, BookingStatus::Canceled).unwrap(),
            StatusChange::Apply(BookingStatus::Canceled)
        );
    }

    #[test]
    fn test_terminal_states_are_final() {
        let lifecycle = BookingLifecycle::new();
        for terminal in [BookingStatus::Completed, BookingStatus::Canceled] {
            assert_matches!(
                lifecycle.validate_status_transition(terminal, BookingStatus::Waiting),
                Err(BookingError::InvalidState { .. })
            );
            assert_matches!(lifecycle.ensure_editable(terminal), Err(BookingError::InvalidState { .. }));
        }
        assert_matches!(
            lifecycle.validate_status_transition(BookingStatus::Completed, BookingStatus::Canceled),
            Err(BookingError::InvalidState { status: BookingStatus::Completed, .. })
        );
    }

    #[test]
    fn test_same_status_is_noop() {
        let lifecycle = BookingLifecycle::new();
        for status in [BookingStatus::Waiting, BookingStatus::Canceled, BookingStatus::Completed] {
            assert_eq!(lifecycle.validate_status_transition(status, status).unwrap(), StatusChange::Unchanged);
        }
    }
}
