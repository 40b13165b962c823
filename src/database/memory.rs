use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::database::models::{
    AuditEvent, NewGrant, NewOrganization, Organization, OrganizationPatch, Profile, RoleAssignment,
};
use crate::database::store::{AssignmentStore, AuditLog, DirectoryStore, StoreError};
use crate::permissions::Role;
use crate::types::Lifecycle;

/// Seed data for the in-memory store (`PANEL_MEMORY_FIXTURE`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryData {
    #[serde(default)]
    pub organizations: Vec<Organization>,
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub assignments: Vec<RoleAssignment>,
    #[serde(default)]
    pub audit: Vec<AuditEvent>,
}

/// Process-local store with the same semantics as [`PgStore`](super::PgStore).
/// Used for local development and tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<MemoryData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: MemoryData) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    pub fn from_fixture(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let data: MemoryData = serde_json::from_str(&content)?;
        info!(
            "Loaded memory fixture: {} organizations, {} profiles, {} assignments",
            data.organizations.len(),
            data.profiles.len(),
            data.assignments.len()
        );
        Ok(Self::with_data(data))
    }

    pub async fn insert_organization(&self, organization: Organization) {
        self.data.write().await.organizations.push(organization);
    }

    pub async fn insert_profile(&self, profile: Profile) {
        self.data.write().await.profiles.push(profile);
    }

    pub async fn insert_assignment(&self, assignment: RoleAssignment) {
        self.data.write().await.assignments.push(assignment);
    }

    /// Every assignment row for a user, including inactive ones
    pub async fn assignments_for(&self, user_id: Uuid) -> Vec<RoleAssignment> {
        self.data
            .read()
            .await
            .assignments
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn audit_events(&self) -> Vec<AuditEvent> {
        self.data.read().await.audit.clone()
    }
}

#[async_trait]
impl AssignmentStore for MemoryStore {
    async fn fetch_active_assignments(&self, user_id: Uuid) -> Result<Vec<RoleAssignment>, StoreError> {
        let now = Utc::now();
        Ok(self
            .data
            .read()
            .await
            .assignments
            .iter()
            .filter(|a| a.user_id == user_id && a.is_live_at(now))
            .cloned()
            .collect())
    }

    async fn organization_assignments(&self, organization_id: Uuid) -> Result<Vec<RoleAssignment>, StoreError> {
        let now = Utc::now();
        Ok(self
            .data
            .read()
            .await
            .assignments
            .iter()
            .filter(|a| a.organization_id == Some(organization_id) && a.is_live_at(now))
            .cloned()
            .collect())
    }

    async fn holders_of_role(
        &self,
        user_ids: &[Uuid],
        organization_id: Option<Uuid>,
        role: Role,
    ) -> Result<HashSet<Uuid>, StoreError> {
        let now = Utc::now();
        Ok(self
            .data
            .read()
            .await
            .assignments
            .iter()
            .filter(|a| {
                user_ids.contains(&a.user_id)
                    && a.organization_id == organization_id
                    && a.role == role
                    && a.is_live_at(now)
            })
            .map(|a| a.user_id)
            .collect())
    }

    async fn system_admins_among(&self, user_ids: &[Uuid]) -> Result<HashSet<Uuid>, StoreError> {
        let now = Utc::now();
        Ok(self
            .data
            .read()
            .await
            .assignments
            .iter()
            .filter(|a| user_ids.contains(&a.user_id) && a.role == Role::SystemAdmin && a.is_live_at(now))
            .map(|a| a.user_id)
            .collect())
    }

    async fn grant_role(&self, user_ids: &[Uuid], grant: &NewGrant) -> Result<u64, StoreError> {
        let mut data = self.data.write().await;
        data.assignments
            .extend(user_ids.iter().map(|user_id| grant.to_assignment(*user_id)));
        Ok(user_ids.len() as u64)
    }

    async fn deactivate_assignments(
        &self,
        user_ids: &[Uuid],
        organization_id: Option<Uuid>,
        role: Option<Role>,
    ) -> Result<u64, StoreError> {
        let mut data = self.data.write().await;
        let mut affected = 0;
        for assignment in data.assignments.iter_mut() {
            let matches = user_ids.contains(&assignment.user_id)
                && assignment.state.is_active()
                && organization_id.map_or(true, |org| assignment.organization_id == Some(org))
                && role.map_or(true, |r| assignment.role == r);
            if matches {
                assignment.state = Lifecycle::Inactive;
                affected += 1;
            }
        }
        Ok(affected)
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn list_organizations(&self, ids: Option<&[Uuid]>) -> Result<Vec<Organization>, StoreError> {
        let mut organizations: Vec<Organization> = self
            .data
            .read()
            .await
            .organizations
            .iter()
            .filter(|o| ids.map_or(true, |ids| ids.contains(&o.id)))
            .cloned()
            .collect();
        organizations.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(organizations)
    }

    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>, StoreError> {
        Ok(self
            .data
            .read()
            .await
            .organizations
            .iter()
            .find(|o| o.id == id)
            .cloned())
    }

    async fn create_organization(&self, new: NewOrganization) -> Result<Organization, StoreError> {
        let mut data = self.data.write().await;
        if data.organizations.iter().any(|o| o.slug == new.slug) {
            return Err(StoreError::Conflict(format!(
                "organization slug '{}' already exists",
                new.slug
            )));
        }
        let organization = Organization::from_new(new);
        data.organizations.push(organization.clone());
        Ok(organization)
    }

    async fn update_organization(
        &self,
        id: Uuid,
        patch: &OrganizationPatch,
    ) -> Result<Option<Organization>, StoreError> {
        let mut data = self.data.write().await;
        Ok(data.organizations.iter_mut().find(|o| o.id == id).map(|organization| {
            organization.apply(patch);
            organization.clone()
        }))
    }

    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(self.data.read().await.profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn set_profiles_state(&self, ids: &[Uuid], state: Lifecycle) -> Result<u64, StoreError> {
        let mut data = self.data.write().await;
        let now = Utc::now();
        let mut affected = 0;
        for profile in data.profiles.iter_mut().filter(|p| ids.contains(&p.id)) {
            profile.state = state;
            profile.updated_at = now;
            affected += 1;
        }
        Ok(affected)
    }
}

#[async_trait]
impl AuditLog for MemoryStore {
    async fn record(&self, event: AuditEvent) -> Result<(), StoreError> {
        self.data.write().await.audit.push(event);
        Ok(())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<AuditEvent>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .audit
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
