pub mod booking;
pub mod code;
pub mod conflict;
pub mod lifecycle;
pub mod repository;
pub mod staff;

pub use booking::BookingService;
pub use code::{CodeSource, LookupCodeGenerator, RandomDigits};
pub use conflict::SlotConflictChecker;
pub use lifecycle::{BookingLifecycle, StatusChange};
pub use repository::{
    BookingRepository, InMemoryBookingRepository, InMemoryStaffBookingRepository, StaffBookingRepository,
};
pub use staff::StaffBookingService;
