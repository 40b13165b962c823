use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{
    AuditEvent, NewGrant, NewOrganization, Organization, OrganizationPatch, Profile, RoleAssignment,
};
use crate::permissions::Role;
use crate::types::Lifecycle;

/// Errors from the backing store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Role assignment rows: the single source of truth for authorization.
///
/// Every "live" query filters `is_active AND (expires_at IS NULL OR expires_at > now)`.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    async fn fetch_active_assignments(&self, user_id: Uuid) -> Result<Vec<RoleAssignment>, StoreError>;

    async fn organization_assignments(&self, organization_id: Uuid) -> Result<Vec<RoleAssignment>, StoreError>;

    /// Subset of `user_ids` holding a live `role` assignment in `organization_id`.
    async fn holders_of_role(
        &self,
        user_ids: &[Uuid],
        organization_id: Option<Uuid>,
        role: Role,
    ) -> Result<HashSet<Uuid>, StoreError>;

    /// Subset of `user_ids` holding any live SYSTEM_ADMIN assignment.
    async fn system_admins_among(&self, user_ids: &[Uuid]) -> Result<HashSet<Uuid>, StoreError>;

    /// Inserts one assignment per user id in a single statement.
    async fn grant_role(&self, user_ids: &[Uuid], grant: &NewGrant) -> Result<u64, StoreError>;

    /// Flips matching active assignments to inactive. `None` filters match everything.
    async fn deactivate_assignments(
        &self,
        user_ids: &[Uuid],
        organization_id: Option<Uuid>,
        role: Option<Role>,
    ) -> Result<u64, StoreError>;
}

/// Organizations and user profiles.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn health_check(&self) -> Result<(), StoreError>;

    /// `None` lists every organization.
    async fn list_organizations(&self, ids: Option<&[Uuid]>) -> Result<Vec<Organization>, StoreError>;

    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>, StoreError>;

    async fn create_organization(&self, new: NewOrganization) -> Result<Organization, StoreError>;

    async fn update_organization(
        &self,
        id: Uuid,
        patch: &OrganizationPatch,
    ) -> Result<Option<Organization>, StoreError>;

    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError>;

    async fn set_profiles_state(&self, ids: &[Uuid], state: Lifecycle) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, event: AuditEvent) -> Result<(), StoreError>;

    async fn recent(&self, limit: i64) -> Result<Vec<AuditEvent>, StoreError>;
}

/// Everything a request handler needs from persistence.
pub trait PanelStore: AssignmentStore + DirectoryStore + AuditLog {}

impl<T: AssignmentStore + DirectoryStore + AuditLog> PanelStore for T {}
