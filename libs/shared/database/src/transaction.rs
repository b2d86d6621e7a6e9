use std::time::Instant;

use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

const SLOW_TRANSACTION_MS: u128 = 250;

/// Serializes read-then-write sequences against the in-process stores.
///
/// Booking slot checks and daily ticket numbering are check-then-act pairs; every
/// such pair runs while holding one [`Transaction`]. A SQL-backed deployment swaps
/// this for a SERIALIZABLE transaction with the same scope.
#[derive(Debug, Default)]
pub struct TransactionGate {
    lock: Mutex<()>,
}

pub struct Transaction<'a> {
    _guard: MutexGuard<'a, ()>,
    label: &'static str,
    started: Instant,
}

impl TransactionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn begin(&self, label: &'static str) -> Transaction<'_> {
        let guard = self.lock.lock().await;
        debug!("Transaction '{}' started", label);
        Transaction {
            _guard: guard,
            label,
            started: Instant::now(),
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed().as_millis();
        if elapsed > SLOW_TRANSACTION_MS {
            warn!("Transaction '{}' held the gate for {} ms", self.label, elapsed);
        } else {
            debug!("Transaction '{}' finished in {} ms", self.label, elapsed);
        }
    }
}
