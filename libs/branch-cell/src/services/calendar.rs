// libs/branch-cell/src/services/calendar.rs
use chrono::{Datelike, NaiveDateTime};
use tracing::{debug, warn};

use shared_utils::clock::Clock;

use crate::models::{Branch, DayOfWeek, WeeklySchedule};

/// Answers "is this branch open at time T" from its weekly schedule.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleCalendar;

impl ScheduleCalendar {
    pub fn new() -> Self {
        Self
    }

    /// Open iff the weekday of `at` has an entry and `open_time <= at.time() <= close_time`.
    ///
    /// A weekday with several entries is treated as closed.
    pub fn is_open(&self, branch: &Branch, at: NaiveDateTime) -> bool {
        let day = DayOfWeek::from(at.weekday());
        let Some(schedule) = self.schedule_for(branch, day) else {
            debug!("Branch {} has no usable schedule for {}", branch.id, day);
            return false;
        };

        schedule.covers(at.time())
    }

    pub fn is_open_now(&self, branch: &Branch, clock: &dyn Clock) -> bool {
        self.is_open(branch, clock.now())
    }

    pub fn schedule_for<'a>(&self, branch: &'a Branch, day: DayOfWeek) -> Option<&'a WeeklySchedule> {
        let mut matching = branch.schedules.iter().filter(|schedule| schedule.day == day);
        let first = matching.next()?;
        if matching.next().is_some() {
            warn!("Branch {} has multiple schedule entries for {}, treating as closed", branch.id, day);
            return None;
        }
        Some(first)
    }
}
