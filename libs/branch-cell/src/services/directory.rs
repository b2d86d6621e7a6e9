// libs/branch-cell/src/services/directory.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::BranchError;
use crate::models::{validate_schedules, Branch, BranchQuery, DayOfWeek, Service, StaffMember, WeeklySchedule};

/// Storage seam for branches, their weekly schedules and the service catalogue.
///
/// Implementations must keep at most one schedule entry per (branch, weekday) and
/// at most one branch per staff member.
#[async_trait]
pub trait BranchDirectory: Send + Sync {
    async fn insert_branch(&self, branch: Branch) -> Result<Branch, BranchError>;

    async fn get_branch(&self, id: Uuid) -> Result<Option<Branch>, BranchError>;

    async fn list_branches(&self, query: &BranchQuery) -> Result<Vec<Branch>, BranchError>;

    async fn set_schedule(
        &self,
        branch_id: Uuid,
        schedule: WeeklySchedule,
        now: NaiveDateTime,
    ) -> Result<Branch, BranchError>;

    async fn remove_schedule(
        &self,
        branch_id: Uuid,
        day: DayOfWeek,
        now: NaiveDateTime,
    ) -> Result<Branch, BranchError>;

    async fn insert_service(&self, service: Service) -> Result<Service, BranchError>;

    async fn get_service(&self, id: Uuid) -> Result<Option<Service>, BranchError>;

    async fn list_services(&self) -> Result<Vec<Service>, BranchError>;

    /// Places the user at `member.branch_id`, replacing any earlier assignment.
    async fn assign_staff(&self, member: StaffMember) -> Result<StaffMember, BranchError>;

    async fn get_staff(&self, user_id: Uuid) -> Result<Option<StaffMember>, BranchError>;

    async fn list_staff(&self, branch_id: Uuid) -> Result<Vec<StaffMember>, BranchError>;
}

#[derive(Default)]
pub struct InMemoryBranchDirectory {
    branches: RwLock<HashMap<Uuid, Branch>>,
    services: RwLock<HashMap<Uuid, Service>>,
    staff: RwLock<HashMap<Uuid, StaffMember>>,
}

impl InMemoryBranchDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BranchDirectory for InMemoryBranchDirectory {
    async fn insert_branch(&self, mut branch: Branch) -> Result<Branch, BranchError> {
        validate_schedules(&branch.schedules)?;
        branch.schedules.sort_by_key(|schedule| schedule.day);

        let mut branches = self.branches.write().await;
        branches.insert(branch.id, branch.clone());
        debug!("Stored branch {}", branch.id);
        Ok(branch)
    }

    async fn get_branch(&self, id: Uuid) -> Result<Option<Branch>, BranchError> {
        Ok(self.branches.read().await.get(&id).cloned())
    }

    async fn list_branches(&self, query: &BranchQuery) -> Result<Vec<Branch>, BranchError> {
        let branches = self.branches.read().await;
        let mut result: Vec<Branch> = branches
            .values()
            .filter(|branch| {
                query.city.as_ref().map_or(true, |city| branch.city.eq_ignore_ascii_case(city))
            })
            .cloned()
            .collect();

        // Newest first
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(result)
    }

    async fn set_schedule(
        &self,
        branch_id: Uuid,
        schedule: WeeklySchedule,
        now: NaiveDateTime,
    ) -> Result<Branch, BranchError> {
        schedule.validate()?;

        let mut branches = self.branches.write().await;
        let branch = branches
            .get_mut(&branch_id)
            .ok_or(BranchError::NotFound(branch_id))?;
        branch.set_schedule(schedule, now);
        Ok(branch.clone())
    }

    async fn remove_schedule(
        &self,
        branch_id: Uuid,
        day: DayOfWeek,
        now: NaiveDateTime,
    ) -> Result<Branch, BranchError> {
        let mut branches = self.branches.write().await;
        let branch = branches
            .get_mut(&branch_id)
            .ok_or(BranchError::NotFound(branch_id))?;
        branch.remove_schedule(day, now);
        Ok(branch.clone())
    }

    async fn insert_service(&self, service: Service) -> Result<Service, BranchError> {
        let mut services = self.services.write().await;
        if services.values().any(|existing| existing.name == service.name) {
            return Err(BranchError::DuplicateService(service.name));
        }
        services.insert(service.id, service.clone());
        Ok(service)
    }

    async fn get_service(&self, id: Uuid) -> Result<Option<Service>, BranchError> {
        Ok(self.services.read().await.get(&id).cloned())
    }

    async fn list_services(&self) -> Result<Vec<Service>, BranchError> {
        let mut services: Vec<Service> = self.services.read().await.values().cloned().collect();
        services.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.name.cmp(&b.name)));
        Ok(services)
    }

    async fn assign_staff(&self, member: StaffMember) -> Result<StaffMember, BranchError> {
        if !self.branches.read().await.contains_key(&member.branch_id) {
            return Err(BranchError::NotFound(member.branch_id));
        }

        let previous = self.staff.write().await.insert(member.user_id, member.clone());
        if let Some(previous) = previous.filter(|p| p.branch_id != member.branch_id) {
            debug!("Moved staff {} from branch {}", member.user_id, previous.branch_id);
        }
        Ok(member)
    }

    async fn get_staff(&self, user_id: Uuid) -> Result<Option<StaffMember>, BranchError> {
        Ok(self.staff.read().await.get(&user_id).cloned())
    }

    async fn list_staff(&self, branch_id: Uuid) -> Result<Vec<StaffMember>, BranchError> {
        let mut members: Vec<StaffMember> = self
            .staff
            .read()
            .await
            .values()
            .filter(|member| member.works_at(branch_id))
            .cloned()
            .collect();
        members.sort_by(|a, b| a.assigned_at.cmp(&b.assigned_at).then_with(|| a.user_id.cmp(&b.user_id)));
        Ok(members)
    }
}
