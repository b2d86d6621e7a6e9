pub mod branch;
pub mod calendar;
pub mod directory;

pub use branch::BranchService;
pub use calendar::ScheduleCalendar;
pub use directory::{BranchDirectory, InMemoryBranchDirectory};
