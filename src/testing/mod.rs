use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;

use crate::database::models::{
    AuditEvent, NewGrant, NewOrganization, Organization, OrganizationPatch, Profile, RoleAssignment,
};
use crate::database::{AssignmentStore, AuditLog, DirectoryStore, MemoryStore, StoreError};
use crate::permissions::Role;
use crate::types::Lifecycle;

pub const ORG_1: Uuid = Uuid::from_u128(0x0001);
pub const ORG_2: Uuid = Uuid::from_u128(0x0002);

/// Live assignment with no explicit permissions and no expiry
pub fn assignment(user_id: Uuid, role: Role, organization_id: Option<Uuid>) -> RoleAssignment {
    RoleAssignment::new(user_id, role, organization_id)
}

/// Memory store with ORG_1 and ORG_2 and an active profile for each user
pub async fn seeded_store(users: &[Uuid]) -> MemoryStore {
    let store = MemoryStore::new();
    store.insert_organization(Organization::new(ORG_1, "Org One", "org-one")).await;
    store.insert_organization(Organization::new(ORG_2, "Org Two", "org-two")).await;
    for user in users {
        store
            .insert_profile(Profile::new(*user, format!("{}@example.com", user.simple())))
            .await;
    }
    store
}

/// Store whose every call fails as if the database were down
pub struct FailingStore;

fn down() -> StoreError {
    StoreError::Unavailable("connection refused".to_string())
}

#[async_trait]
impl AssignmentStore for FailingStore {
    async fn fetch_active_assignments(&self, _user_id: Uuid) -> Result<Vec<RoleAssignment>, StoreError> {
        Err(down())
    }

    async fn organization_assignments(&self, _organization_id: Uuid) -> Result<Vec<RoleAssignment>, StoreError> {
        Err(down())
    }

    async fn holders_of_role(
        &self,
        _user_ids: &[Uuid],
        _organization_id: Option<Uuid>,
        _role: Role,
    ) -> Result<HashSet<Uuid>, StoreError> {
        Err(down())
    }

    async fn system_admins_among(&self, _user_ids: &[Uuid]) -> Result<HashSet<Uuid>, StoreError> {
        Err(down())
    }

    async fn grant_role(&self, _user_ids: &[Uuid], _grant: &NewGrant) -> Result<u64, StoreError> {
        Err(down())
    }

    async fn deactivate_assignments(
        &self,
        _user_ids: &[Uuid],
        _organization_id: Option<Uuid>,
        _role: Option<Role>,
    ) -> Result<u64, StoreError> {
        Err(down())
    }
}

#[async_trait]
impl DirectoryStore for FailingStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        Err(down())
    }

    async fn list_organizations(&self, _ids: Option<&[Uuid]>) -> Result<Vec<Organization>, StoreError> {
        Err(down())
    }

    async fn find_organization(&self, _id: Uuid) -> Result<Option<Organization>, StoreError> {
        Err(down())
    }

    async fn create_organization(&self, _new: NewOrganization) -> Result<Organization, StoreError> {
        Err(down())
    }

    async fn update_organization(
        &self,
        _id: Uuid,
        _patch: &OrganizationPatch,
    ) -> Result<Option<Organization>, StoreError> {
        Err(down())
    }

    async fn find_profile(&self, _id: Uuid) -> Result<Option<Profile>, StoreError> {
        Err(down())
    }

    async fn set_profiles_state(&self, _ids: &[Uuid], _state: Lifecycle) -> Result<u64, StoreError> {
        Err(down())
    }
}

#[async_trait]
impl AuditLog for FailingStore {
    async fn record(&self, _event: AuditEvent) -> Result<(), StoreError> {
        Err(down())
    }

    async fn recent(&self, _limit: i64) -> Result<Vec<AuditEvent>, StoreError> {
        Err(down())
    }
}
