// libs/booking-cell/src/services/code.rs
use rand::Rng;
use tracing::{debug, warn};

use crate::error::BookingError;
use crate::models::LOOKUP_CODE_LENGTH;
use crate::services::repository::BookingRepository;

pub trait CodeSource: Send + Sync {
    fn next_code(&self) -> String;
}

/// Ten decimal digits, each drawn uniformly. Not cryptographically strong.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomDigits;

impl CodeSource for RandomDigits {
    fn next_code(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..LOOKUP_CODE_LENGTH)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }
}

/// Produces lookup codes that are not yet used by any stored booking.
pub struct LookupCodeGenerator {
    source: Box<dyn CodeSource>,
    max_attempts: u32,
}

impl LookupCodeGenerator {
    pub fn new(max_attempts: u32) -> Self {
        Self::with_source(Box::new(RandomDigits), max_attempts)
    }

    pub fn with_source(source: Box<dyn CodeSource>, max_attempts: u32) -> Self {
        Self {
            source,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn generate(&self) -> String {
        self.source.next_code()
    }

    /// Must run inside the booking transaction so the code cannot be taken meanwhile.
    pub async fn generate_unique(&self, bookings: &dyn BookingRepository) -> Result<String, BookingError> {
        for attempt in 1..=self.max_attempts {
            let code = self.generate();
            if !bookings.code_exists(&code).await? {
                return Ok(code);
            }
            debug!("Lookup code collision on attempt {}", attempt);
        }

        warn!("Exhausted {} attempts generating a lookup code", self.max_attempts);
        Err(BookingError::CodeGenerationExhausted { attempts: self.max_attempts })
    }
}
