// libs/branch-cell/src/models.rs
use std::collections::HashSet;
use std::fmt;

use chrono::{NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BranchError;

pub const MAX_ADDRESS_LENGTH: usize = 100;
pub const MAX_SERVICE_NAME_LENGTH: usize = 100;

// ==============================================================================
// SCHEDULE MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayOfWeek::Monday => write!(f, "monday"),
            DayOfWeek::Tuesday => write!(f, "tuesday"),
            DayOfWeek::Wednesday => write!(f, "wednesday"),
            DayOfWeek::Thursday => write!(f, "thursday"),
            DayOfWeek::Friday => write!(f, "friday"),
            DayOfWeek::Saturday => write!(f, "saturday"),
            DayOfWeek::Sunday => write!(f, "sunday"),
        }
    }
}

/// Opening hours of a branch for one day of the week. Both bounds are inclusive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeeklySchedule {
    pub day: DayOfWeek,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
}

impl WeeklySchedule {
    pub fn new(day: DayOfWeek, open_time: NaiveTime, close_time: NaiveTime) -> Self {
        Self { day, open_time, close_time }
    }

    pub fn covers(&self, time: NaiveTime) -> bool {
        self.open_time <= time && time <= self.close_time
    }

    pub fn validate(&self) -> Result<(), BranchError> {
        if self.open_time > self.close_time {
            return Err(BranchError::InvalidSchedule {
                day: self.day,
                open_time: self.open_time,
                close_time: self.close_time,
            });
        }
        Ok(())
    }
}

/// Rejects entries with inverted hours and more than one entry per weekday.
pub fn validate_schedules(schedules: &[WeeklySchedule]) -> Result<(), BranchError> {
    let mut seen = HashSet::new();
    for schedule in schedules {
        schedule.validate()?;
        if !seen.insert(schedule.day) {
            return Err(BranchError::DuplicateWeekday(schedule.day));
        }
    }
    Ok(())
}

// ==============================================================================
// CORE BRANCH MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub id: Uuid,
    pub city: String,
    pub address: String,
    pub description: String,
    pub schedules: Vec<WeeklySchedule>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Branch {
    /// Replaces the entry for the schedule's weekday, keeping entries ordered Monday..Sunday.
    pub fn set_schedule(&mut self, schedule: WeeklySchedule, now: NaiveDateTime) {
        self.schedules.retain(|existing| existing.day != schedule.day);
        self.schedules.push(schedule);
        self.schedules.sort_by_key(|s| s.day);
        self.updated_at = now;
    }

    pub fn remove_schedule(&mut self, day: DayOfWeek, now: NaiveDateTime) -> bool {
        let before = self.schedules.len();
        self.schedules.retain(|existing| existing.day != day);
        let removed = self.schedules.len() != before;
        if removed {
            self.updated_at = now;
        }
        removed
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.city, self.address)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub created_at: NaiveDateTime,
}

/// An employee working at one branch. A user is assigned to at most one branch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StaffMember {
    pub user_id: Uuid,
    pub branch_id: Uuid,
    pub assigned_at: NaiveDateTime,
}

impl StaffMember {
    pub fn works_at(&self, branch_id: Uuid) -> bool {
        self.branch_id == branch_id
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBranchRequest {
    pub city: String,
    pub address: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub schedules: Vec<WeeklySchedule>,
}

impl CreateBranchRequest {
    pub fn validate(&self) -> Result<(), BranchError> {
        if self.city.trim().is_empty() {
            return Err(BranchError::ValidationError("City is required".to_string()));
        }
        if self.address.trim().is_empty() {
            return Err(BranchError::ValidationError("Address is required".to_string()));
        }
        if self.address.chars().count() > MAX_ADDRESS_LENGTH {
            return Err(BranchError::ValidationError(format!(
                "Address must be at most {} characters",
                MAX_ADDRESS_LENGTH
            )));
        }
        validate_schedules(&self.schedules)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignStaffRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchQuery {
    pub city: Option<String>,
}

/// Branch as shown to visitors, with the open/closed flag computed at read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchView {
    #[serde(flatten)]
    pub branch: Branch,
    pub is_open: bool,
}

/// Compact branch reference embedded in booking and ticket views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchSummary {
    pub id: Uuid,
    pub city: String,
    pub address: String,
    pub is_open: bool,
}

impl BranchSummary {
    pub fn from_branch(branch: &Branch, is_open: bool) -> Self {
        Self {
            id: branch.id,
            city: branch.city.clone(),
            address: branch.address.clone(),
            is_open,
        }
    }
}
