// libs/branch-cell/src/services/branch.rs
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use shared_utils::clock::Clock;

use crate::error::BranchError;
use crate::models::{
    Branch, BranchQuery, BranchSummary, BranchView, CreateBranchRequest, CreateServiceRequest,
    DayOfWeek, Service, StaffMember, WeeklySchedule, MAX_SERVICE_NAME_LENGTH,
};
use crate::services::calendar::ScheduleCalendar;
use crate::services::directory::BranchDirectory;

pub struct BranchService {
    directory: Arc<dyn BranchDirectory>,
    calendar: ScheduleCalendar,
    clock: Arc<dyn Clock>,
}

impl BranchService {
    pub fn new(directory: Arc<dyn BranchDirectory>, clock: Arc<dyn Clock>) -> Self {
        Self {
            directory,
            calendar: ScheduleCalendar::new(),
            clock,
        }
    }

    pub fn directory(&self) -> Arc<dyn BranchDirectory> {
        Arc::clone(&self.directory)
    }

    pub async fn create_branch(&self, request: CreateBranchRequest) -> Result<Branch, BranchError> {
        if let Err(e) = request.validate() {
            warn!("Rejected branch creation: {}", e);
            return Err(e);
        }

        let now = self.clock.now();
        let branch = Branch {
            id: Uuid::new_v4(),
            city: request.city.trim().to_string(),
            address: request.address.trim().to_string(),
            description: request.description,
            schedules: request.schedules,
            created_at: now,
            updated_at: now,
        };

        let branch = self.directory.insert_branch(branch).await?;
        info!("Created branch {} ({}) with {} schedule entries", branch.id, branch, branch.schedules.len());
        Ok(branch)
    }

    pub async fn get_branch(&self, id: Uuid) -> Result<Branch, BranchError> {
        self.directory
            .get_branch(id)
            .await?
            .ok_or(BranchError::NotFound(id))
    }

    pub async fn get_branch_view(&self, id: Uuid) -> Result<BranchView, BranchError> {
        let branch = self.get_branch(id).await?;
        Ok(self.to_view(branch))
    }

    pub async fn list_branch_views(&self, query: &BranchQuery) -> Result<Vec<BranchView>, BranchError> {
        let branches = self.directory.list_branches(query).await?;
        Ok(branches.into_iter().map(|branch| self.to_view(branch)).collect())
    }

    pub async fn summary(&self, id: Uuid) -> Result<BranchSummary, BranchError> {
        let branch = self.get_branch(id).await?;
        let is_open = self.calendar.is_open_now(&branch, self.clock.as_ref());
        Ok(BranchSummary::from_branch(&branch, is_open))
    }

    pub async fn set_schedule(&self, branch_id: Uuid, schedule: WeeklySchedule) -> Result<Branch, BranchError> {
        let day = schedule.day;
        let branch = self.directory.set_schedule(branch_id, schedule, self.clock.now()).await?;
        info!("Updated {} hours for branch {}", day, branch_id);
        Ok(branch)
    }

    pub async fn remove_schedule(&self, branch_id: Uuid, day: DayOfWeek) -> Result<Branch, BranchError> {
        let branch = self.directory.remove_schedule(branch_id, day, self.clock.now()).await?;
        info!("Branch {} is now closed on {}", branch_id, day);
        Ok(branch)
    }

    /// Whether the branch accepts visits at `at`.
    pub async fn is_open_at(&self, branch_id: Uuid, at: NaiveDateTime) -> Result<bool, BranchError> {
        let branch = self.get_branch(branch_id).await?;
        Ok(self.calendar.is_open(&branch, at))
    }

    pub async fn create_service(&self, request: CreateServiceRequest) -> Result<Service, BranchError> {
        let name = request.name.trim().to_string();
        if name.is_empty() || name.chars().count() > MAX_SERVICE_NAME_LENGTH {
            return Err(BranchError::ValidationError(format!(
                "Service name must be 1 to {} characters",
                MAX_SERVICE_NAME_LENGTH
            )));
        }

        let service = Service {
            id: Uuid::new_v4(),
            name,
            created_at: self.clock.now(),
        };
        let service = self.directory.insert_service(service).await?;
        info!("Created service {} ({})", service.id, service.name);
        Ok(service)
    }

    pub async fn get_service(&self, id: Uuid) -> Result<Service, BranchError> {
        self.directory
            .get_service(id)
            .await?
            .ok_or(BranchError::ServiceNotFound(id))
    }

    pub async fn list_services(&self) -> Result<Vec<Service>, BranchError> {
        self.directory.list_services().await
    }

    pub async fn assign_staff(&self, branch_id: Uuid, user_id: Uuid) -> Result<StaffMember, BranchError> {
        let member = StaffMember {
            user_id,
            branch_id,
            assigned_at: self.clock.now(),
        };
        let member = self.directory.assign_staff(member).await?;
        info!("User {} now works at branch {}", user_id, branch_id);
        Ok(member)
    }

    pub async fn get_staff(&self, user_id: Uuid) -> Result<StaffMember, BranchError> {
        self.directory
            .get_staff(user_id)
            .await?
            .ok_or(BranchError::StaffNotFound(user_id))
    }

    pub async fn list_staff(&self, branch_id: Uuid) -> Result<Vec<StaffMember>, BranchError> {
        self.get_branch(branch_id).await?;
        self.directory.list_staff(branch_id).await
    }

    fn to_view(&self, branch: Branch) -> BranchView {
        let is_open = self.calendar.is_open_now(&branch, self.clock.as_ref());
        BranchView { branch, is_open }
    }
}
