use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::catalog::{Permission, Role};
use super::error::{AuthzError, PermissionError};
use super::requirement::Requirement;
use super::resolver::PermissionResolver;
use crate::database::models::RoleAssignment;
use crate::database::{AssignmentStore, DirectoryStore, StoreError};

/// A caller's assignments, loaded once per request.
///
/// Checks run against the instant the assignments were loaded so every check
/// within one request sees the same state.
#[derive(Debug, Clone)]
pub struct AuthorizationContext {
    pub caller_id: Uuid,
    assignments: Vec<RoleAssignment>,
    loaded_at: DateTime<Utc>,
}

impl AuthorizationContext {
    pub fn new(caller_id: Uuid, assignments: Vec<RoleAssignment>) -> Self {
        Self::at(caller_id, assignments, Utc::now())
    }

    pub fn at(caller_id: Uuid, assignments: Vec<RoleAssignment>, loaded_at: DateTime<Utc>) -> Self {
        Self {
            caller_id,
            assignments,
            loaded_at,
        }
    }

    pub fn resolver(&self) -> PermissionResolver<'_> {
        PermissionResolver::at(&self.assignments, self.loaded_at)
    }

    pub fn assignments(&self) -> &[RoleAssignment] {
        &self.assignments
    }

    pub fn is_system_admin(&self) -> bool {
        self.resolver().is_system_admin()
    }

    pub fn require(&self, requirement: Requirement, organization_id: Option<Uuid>) -> Result<(), PermissionError> {
        if self.resolver().satisfies(&requirement, organization_id) {
            tracing::debug!(
                caller = %self.caller_id,
                organization = ?organization_id,
                "Authorization granted: {}",
                requirement
            );
            return Ok(());
        }

        tracing::warn!(
            caller = %self.caller_id,
            organization = ?organization_id,
            "Authorization denied: {} required",
            requirement
        );
        Err(PermissionError {
            caller_id: self.caller_id,
            requirement,
            organization_id,
        })
    }

    pub fn require_permission(&self, permission: Permission, organization_id: Option<Uuid>) -> Result<(), PermissionError> {
        self.require(Requirement::Permission(permission), organization_id)
    }

    pub fn require_all_permissions(
        &self,
        permissions: &[Permission],
        organization_id: Option<Uuid>,
    ) -> Result<(), PermissionError> {
        self.require(Requirement::AllPermissions(permissions.to_vec()), organization_id)
    }

    pub fn require_role(&self, role: Role, organization_id: Option<Uuid>) -> Result<(), PermissionError> {
        self.require(Requirement::Role(role), organization_id)
    }

    pub fn require_any_role(&self, roles: &[Role], organization_id: Option<Uuid>) -> Result<(), PermissionError> {
        self.require(Requirement::AnyRole(roles.to_vec()), organization_id)
    }

    pub fn require_system_admin(&self) -> Result<(), PermissionError> {
        self.require(Requirement::SystemAdmin, None)
    }

    /// A grant may only hand out what the caller already holds.
    ///
    /// SYSTEM_ADMIN is reserved to system administrators. Any other role needs
    /// `manage_org_users` in the target organization, and every explicit
    /// permission on the grant must be held there too.
    pub fn require_grant(
        &self,
        role: Role,
        organization_id: Option<Uuid>,
        permissions: &[Permission],
    ) -> Result<(), PermissionError> {
        if role == Role::SystemAdmin {
            return self.require_system_admin();
        }
        self.require_permission(Permission::ManageOrgUsers, organization_id)?;
        if permissions.is_empty() {
            return Ok(());
        }
        self.require_all_permissions(permissions, organization_id)
    }
}

/// Server-side enforcement point for privileged operations.
///
/// Reads the caller's profile state and live assignments; performs no writes.
pub struct AuthorizationGate<'s, S: AssignmentStore + DirectoryStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: AssignmentStore + DirectoryStore + ?Sized> AuthorizationGate<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// A deactivated profile carries no privileges, whatever rows it still has.
    pub async fn load_context(&self, caller_id: Uuid) -> Result<AuthorizationContext, StoreError> {
        let profile = self.store.find_profile(caller_id).await.map_err(|e| {
            tracing::error!("Failed to load profile for {}: {}", caller_id, e);
            e
        })?;
        if profile.is_some_and(|p| !p.state.is_active()) {
            tracing::warn!(caller = %caller_id, "Profile is inactive, treating as unprivileged");
            return Ok(AuthorizationContext::new(caller_id, Vec::new()));
        }

        let assignments = self.store.fetch_active_assignments(caller_id).await.map_err(|e| {
            tracing::error!("Failed to load role assignments for {}: {}", caller_id, e);
            e
        })?;
        Ok(AuthorizationContext::new(caller_id, assignments))
    }

    pub async fn require(
        &self,
        caller_id: Uuid,
        requirement: Requirement,
        organization_id: Option<Uuid>,
    ) -> Result<AuthorizationContext, AuthzError> {
        let context = self.load_context(caller_id).await?;
        context.require(requirement, organization_id)?;
        Ok(context)
    }

    pub async fn require_permission(
        &self,
        caller_id: Uuid,
        permission: Permission,
        organization_id: Option<Uuid>,
    ) -> Result<AuthorizationContext, AuthzError> {
        self.require(caller_id, Requirement::Permission(permission), organization_id)
            .await
    }

    pub async fn require_all_permissions(
        &self,
        caller_id: Uuid,
        permissions: &[Permission],
        organization_id: Option<Uuid>,
    ) -> Result<AuthorizationContext, AuthzError> {
        self.require(caller_id, Requirement::AllPermissions(permissions.to_vec()), organization_id)
            .await
    }

    pub async fn require_role(
        &self,
        caller_id: Uuid,
        role: Role,
        organization_id: Option<Uuid>,
    ) -> Result<AuthorizationContext, AuthzError> {
        self.require(caller_id, Requirement::Role(role), organization_id).await
    }

    pub async fn require_any_role(
        &self,
        caller_id: Uuid,
        roles: &[Role],
        organization_id: Option<Uuid>,
    ) -> Result<AuthorizationContext, AuthzError> {
        self.require(caller_id, Requirement::AnyRole(roles.to_vec()), organization_id)
            .await
    }

    pub async fn require_system_admin(&self, caller_id: Uuid) -> Result<AuthorizationContext, AuthzError> {
        self.require(caller_id, Requirement::SystemAdmin, None).await
    }
}
