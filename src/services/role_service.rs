use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::ServiceError;
use crate::database::models::{AuditEvent, NewGrant};
use crate::database::PanelStore;
use crate::error::ValidationError;
use crate::middleware::RequestProvenance;
use crate::permissions::{AuthorizationGate, Permission, Role};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRoleRequest {
    pub user_id: Uuid,
    pub role: Role,
    #[serde(default)]
    pub organization_id: Option<Uuid>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeRoleRequest {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Single-target role grants and revocations
pub struct RoleService<'a> {
    store: &'a dyn PanelStore,
}

impl<'a> RoleService<'a> {
    pub fn new(store: &'a dyn PanelStore) -> Self {
        Self { store }
    }

    pub async fn assign(
        &self,
        caller_id: Uuid,
        request: AssignRoleRequest,
        provenance: &RequestProvenance,
    ) -> Result<NewGrant, ServiceError> {
        if request.organization_id.is_none() && request.role != Role::SystemAdmin {
            return Err(ValidationError::field(
                "organizationId",
                format!("organizationId is required to assign {}", request.role),
            )
            .into());
        }
        if request.expires_at.is_some_and(|at| at <= Utc::now()) {
            return Err(ValidationError::field("expiresAt", "expiresAt must be in the future").into());
        }

        let context = AuthorizationGate::new(self.store).load_context(caller_id).await?;
        context.require_grant(request.role, request.organization_id, &request.permissions)?;

        if self.store.find_profile(request.user_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("User {} not found", request.user_id)));
        }

        let holders = self
            .store
            .holders_of_role(&[request.user_id], request.organization_id, request.role)
            .await?;
        if !holders.is_empty() {
            return Err(ServiceError::Conflict(format!(
                "User {} already holds {}",
                request.user_id, request.role
            )));
        }

        let grant = NewGrant {
            role: request.role,
            organization_id: request.organization_id,
            permissions: request.permissions,
            expires_at: request.expires_at,
            granted_by: caller_id,
        };
        self.store.grant_role(&[request.user_id], &grant).await?;

        let event = AuditEvent::new(caller_id, "assign_role", "user_role")
            .organization(grant.organization_id)
            .resource(request.user_id)
            .values(
                None,
                Some(json!({
                    "role": grant.role,
                    "permissions": grant.permissions,
                    "expiresAt": grant.expires_at,
                })),
            )
            .provenance(provenance);
        self.store.record(event).await?;

        Ok(grant)
    }

    /// Soft-invalidates the user's matching live assignments; returns how many
    pub async fn revoke(
        &self,
        caller_id: Uuid,
        request: RevokeRoleRequest,
        provenance: &RequestProvenance,
    ) -> Result<u64, ServiceError> {
        let context = AuthorizationGate::new(self.store).load_context(caller_id).await?;
        context.require_permission(Permission::ManageOrgUsers, Some(request.organization_id))?;
        if request.role == Some(Role::SystemAdmin) {
            context.require_system_admin()?;
        }
        if request.role.is_none() && !context.is_system_admin() {
            let admins = self
                .store
                .holders_of_role(&[request.user_id], Some(request.organization_id), Role::SystemAdmin)
                .await?;
            if !admins.is_empty() {
                context.require_system_admin()?;
            }
        }

        let removed = self
            .store
            .deactivate_assignments(&[request.user_id], Some(request.organization_id), request.role)
            .await?;
        if removed == 0 {
            return Err(ServiceError::NotFound(format!(
                "No active assignment for user {} in organization {}",
                request.user_id, request.organization_id
            )));
        }

        let event = AuditEvent::new(caller_id, "revoke_role", "user_role")
            .organization(Some(request.organization_id))
            .resource(request.user_id)
            .values(Some(json!({ "role": request.role, "removed": removed })), None)
            .provenance(provenance);
        self.store.record(event).await?;

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::AssignmentStore;
    use crate::permissions::AuthzError;
    use crate::testing::{assignment, seeded_store, ORG_1, ORG_2};

    fn assign(user_id: Uuid, role: Role, organization_id: Option<Uuid>) -> AssignRoleRequest {
        AssignRoleRequest {
            user_id,
            role,
            organization_id,
            permissions: Vec::new(),
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn org_admin_grants_within_their_organization() {
        let org_admin = Uuid::new_v4();
        let member = Uuid::new_v4();
        let store = seeded_store(&[org_admin, member]).await;
        store.insert_assignment(assignment(org_admin, Role::OrgAdmin, Some(ORG_1))).await;
        let service = RoleService::new(&store);

        service
            .assign(org_admin, assign(member, Role::User, Some(ORG_1)), &Default::default())
            .await
            .unwrap();
        assert_eq!(store.fetch_active_assignments(member).await.unwrap().len(), 1);

        let again = service
            .assign(org_admin, assign(member, Role::User, Some(ORG_1)), &Default::default())
            .await;
        assert!(matches!(again, Err(ServiceError::Conflict(_))));

        let elsewhere = service
            .assign(org_admin, assign(member, Role::User, Some(ORG_2)), &Default::default())
            .await;
        assert!(matches!(elsewhere, Err(ServiceError::Authz(AuthzError::Permission(_)))));
    }

    #[tokio::test]
    async fn system_admin_grant_requires_system_admin() {
        let org_admin = Uuid::new_v4();
        let member = Uuid::new_v4();
        let store = seeded_store(&[org_admin, member]).await;
        store.insert_assignment(assignment(org_admin, Role::OrgAdmin, Some(ORG_1))).await;

        let result = RoleService::new(&store)
            .assign(org_admin, assign(member, Role::SystemAdmin, Some(ORG_1)), &Default::default())
            .await;
        assert!(matches!(result, Err(ServiceError::Authz(AuthzError::Permission(_)))));
        assert!(store.fetch_active_assignments(member).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn revoke_soft_invalidates() {
        let admin = Uuid::new_v4();
        let member = Uuid::new_v4();
        let store = seeded_store(&[admin, member]).await;
        store.insert_assignment(assignment(admin, Role::SystemAdmin, None)).await;
        store.insert_assignment(assignment(member, Role::OrgAdmin, Some(ORG_1))).await;
        let service = RoleService::new(&store);

        let request = RevokeRoleRequest {
            user_id: member,
            organization_id: ORG_1,
            role: None,
        };
        assert_eq!(service.revoke(admin, request.clone(), &Default::default()).await.unwrap(), 1);
        assert!(store.fetch_active_assignments(member).await.unwrap().is_empty());
        // The row is kept, only flipped
        assert_eq!(store.assignments_for(member).await.len(), 1);

        let nothing_left = service.revoke(admin, request, &Default::default()).await;
        assert!(matches!(nothing_left, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn explicit_permissions_must_be_held_by_the_granter() {
        let org_admin = Uuid::new_v4();
        let member = Uuid::new_v4();
        let store = seeded_store(&[org_admin, member]).await;
        store.insert_assignment(assignment(org_admin, Role::OrgAdmin, Some(ORG_1))).await;
        let service = RoleService::new(&store);

        let mut escalate = assign(org_admin, Role::User, Some(ORG_1));
        escalate.permissions = vec![Permission::ManageSystemUsers];
        let result = service.assign(org_admin, escalate, &Default::default()).await;
        assert!(matches!(result, Err(ServiceError::Authz(AuthzError::Permission(_)))));
        assert_eq!(store.assignments_for(org_admin).await.len(), 1);

        let mut delegated = assign(member, Role::User, Some(ORG_1));
        delegated.permissions = vec![Permission::ManageOrgApis, Permission::ViewOrgAnalytics];
        let grant = service.assign(org_admin, delegated, &Default::default()).await.unwrap();
        assert_eq!(grant.permissions.len(), 2);
    }

    #[tokio::test]
    async fn org_admin_cannot_revoke_system_admin_rows() {
        let org_admin = Uuid::new_v4();
        let scoped_admin = Uuid::new_v4();
        let store = seeded_store(&[org_admin, scoped_admin]).await;
        store.insert_assignment(assignment(org_admin, Role::OrgAdmin, Some(ORG_1))).await;
        store.insert_assignment(assignment(scoped_admin, Role::SystemAdmin, Some(ORG_1))).await;
        store.insert_assignment(assignment(scoped_admin, Role::User, Some(ORG_1))).await;
        let service = RoleService::new(&store);

        for role in [None, Some(Role::SystemAdmin)] {
            let request = RevokeRoleRequest {
                user_id: scoped_admin,
                organization_id: ORG_1,
                role,
            };
            let result = service.revoke(org_admin, request, &Default::default()).await;
            assert!(matches!(result, Err(ServiceError::Authz(AuthzError::Permission(_)))));
        }
        assert_eq!(store.fetch_active_assignments(scoped_admin).await.unwrap().len(), 2);

        let request = RevokeRoleRequest {
            user_id: scoped_admin,
            organization_id: ORG_1,
            role: Some(Role::User),
        };
        assert_eq!(service.revoke(org_admin, request, &Default::default()).await.unwrap(), 1);
        let live = store.fetch_active_assignments(scoped_admin).await.unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].role, Role::SystemAdmin);
    }
}
