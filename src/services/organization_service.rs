use serde_json::json;
use uuid::Uuid;

use super::ServiceError;
use crate::database::models::{
    AuditEvent, NewOrganization, Organization, OrganizationPatch, RoleAssignment, SUBSCRIPTION_PLANS,
};
use crate::database::PanelStore;
use crate::error::ValidationError;
use crate::middleware::RequestProvenance;
use crate::permissions::{AuthorizationGate, Permission};

/// Organization directory reads and writes, each behind the authorization gate
pub struct OrganizationService<'a> {
    store: &'a dyn PanelStore,
}

impl<'a> OrganizationService<'a> {
    pub fn new(store: &'a dyn PanelStore) -> Self {
        Self { store }
    }

    fn gate(&self) -> AuthorizationGate<'a, dyn PanelStore + 'a> {
        AuthorizationGate::new(self.store)
    }

    /// Every organization for system administrators, otherwise the caller's own
    pub async fn list(&self, caller_id: Uuid) -> Result<Vec<Organization>, ServiceError> {
        let context = self.gate().load_context(caller_id).await?;
        let resolver = context.resolver();

        if resolver.is_system_admin() {
            return Ok(self.store.list_organizations(None).await?);
        }

        let ids: Vec<Uuid> = resolver.organization_ids().into_iter().collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.store.list_organizations(Some(&ids)).await?)
    }

    pub async fn get(&self, caller_id: Uuid, organization_id: Uuid) -> Result<Organization, ServiceError> {
        self.gate()
            .require_permission(caller_id, Permission::AccessApis, Some(organization_id))
            .await?;
        self.find(organization_id).await
    }

    pub async fn create(
        &self,
        caller_id: Uuid,
        new: NewOrganization,
        provenance: &RequestProvenance,
    ) -> Result<Organization, ServiceError> {
        validate_new(&new)?;
        self.gate()
            .require_permission(caller_id, Permission::ManageOrganizations, None)
            .await?;

        let organization = self.store.create_organization(new).await?;
        tracing::info!(caller = %caller_id, "Created organization {} ({})", organization.slug, organization.id);

        let event = AuditEvent::new(caller_id, "create_organization", "organization")
            .organization(Some(organization.id))
            .resource(organization.id)
            .values(None, Some(json!(organization)))
            .provenance(provenance);
        self.store.record(event).await?;

        Ok(organization)
    }

    /// Renaming needs `manage_org_settings` in the organization; plan, limits
    /// and activation are system-level settings.
    pub async fn update(
        &self,
        caller_id: Uuid,
        organization_id: Uuid,
        patch: OrganizationPatch,
        provenance: &RequestProvenance,
    ) -> Result<Organization, ServiceError> {
        validate_patch(&patch)?;

        let context = self.gate().load_context(caller_id).await?;
        context.require_permission(Permission::ManageOrgSettings, Some(organization_id))?;
        let system_level = patch.subscription_plan.is_some()
            || patch.max_users.is_some()
            || patch.max_apis.is_some()
            || patch.is_active.is_some();
        if system_level {
            context.require_permission(Permission::ManageOrganizations, None)?;
        }

        let before = self.find(organization_id).await?;
        let after = self
            .store
            .update_organization(organization_id, &patch)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Organization {} not found", organization_id)))?;

        let event = AuditEvent::new(caller_id, "update_organization", "organization")
            .organization(Some(organization_id))
            .resource(organization_id)
            .values(Some(json!(before)), Some(json!(after)))
            .provenance(provenance);
        self.store.record(event).await?;

        Ok(after)
    }

    /// Live role assignments within an organization
    pub async fn roles(&self, caller_id: Uuid, organization_id: Uuid) -> Result<Vec<RoleAssignment>, ServiceError> {
        self.gate()
            .require_permission(caller_id, Permission::ManageOrgUsers, Some(organization_id))
            .await?;
        self.find(organization_id).await?;
        Ok(self.store.organization_assignments(organization_id).await?)
    }

    async fn find(&self, organization_id: Uuid) -> Result<Organization, ServiceError> {
        self.store
            .find_organization(organization_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Organization {} not found", organization_id)))
    }
}

fn validate_plan(plan: &str) -> Result<(), ValidationError> {
    if SUBSCRIPTION_PLANS.contains(&plan) {
        return Ok(());
    }
    Err(ValidationError::field(
        "subscription_plan",
        format!("Unknown plan '{}', expected one of {}", plan, SUBSCRIPTION_PLANS.join(", ")),
    ))
}

fn validate_limits(max_users: Option<i32>, max_apis: Option<i32>) -> Result<(), ValidationError> {
    if max_users.is_some_and(|n| n < 1) {
        return Err(ValidationError::field("max_users", "max_users must be at least 1"));
    }
    if max_apis.is_some_and(|n| n < 0) {
        return Err(ValidationError::field("max_apis", "max_apis cannot be negative"));
    }
    Ok(())
}

fn validate_new(new: &NewOrganization) -> Result<(), ValidationError> {
    if new.name.trim().is_empty() {
        return Err(ValidationError::field("name", "name is required"));
    }
    let slug_ok = !new.slug.is_empty()
        && new
            .slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !slug_ok {
        return Err(ValidationError::field(
            "slug",
            "slug must be lowercase letters, digits and hyphens",
        ));
    }
    validate_plan(&new.subscription_plan)?;
    validate_limits(Some(new.max_users), Some(new.max_apis))
}

fn validate_patch(patch: &OrganizationPatch) -> Result<(), ValidationError> {
    if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ValidationError::field("name", "name cannot be empty"));
    }
    if let Some(plan) = &patch.subscription_plan {
        validate_plan(plan)?;
    }
    validate_limits(patch.max_users, patch.max_apis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{AuthzError, Role};
    use crate::testing::{assignment, seeded_store, ORG_1, ORG_2};

    fn acme() -> NewOrganization {
        NewOrganization {
            name: "Acme".into(),
            slug: "acme".into(),
            subscription_plan: "starter".into(),
            max_users: 10,
            max_apis: 20,
        }
    }

    #[tokio::test]
    async fn only_system_admins_create() {
        let admin = Uuid::new_v4();
        let org_admin = Uuid::new_v4();
        let store = seeded_store(&[admin, org_admin]).await;
        store.insert_assignment(assignment(admin, Role::SystemAdmin, None)).await;
        store.insert_assignment(assignment(org_admin, Role::OrgAdmin, Some(ORG_1))).await;
        let service = OrganizationService::new(&store);

        let denied = service.create(org_admin, acme(), &Default::default()).await;
        assert!(matches!(denied, Err(ServiceError::Authz(AuthzError::Permission(_)))));

        let created = service.create(admin, acme(), &Default::default()).await.unwrap();
        assert_eq!(created.subscription_plan, "starter");
        assert_eq!(store.audit_events().await[0].action, "create_organization");
    }

    #[tokio::test]
    async fn rejects_unknown_plan_before_gate() {
        let store = seeded_store(&[]).await;
        let mut new = acme();
        new.subscription_plan = "platinum".into();
        let result = OrganizationService::new(&store)
            .create(Uuid::new_v4(), new, &Default::default())
            .await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn org_admin_renames_but_cannot_change_plan() {
        let org_admin = Uuid::new_v4();
        let store = seeded_store(&[org_admin]).await;
        store.insert_assignment(assignment(org_admin, Role::OrgAdmin, Some(ORG_1))).await;
        let service = OrganizationService::new(&store);

        let rename = OrganizationPatch {
            name: Some("Renamed".into()),
            ..Default::default()
        };
        let updated = service
            .update(org_admin, ORG_1, rename.clone(), &Default::default())
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");

        let other = service.update(org_admin, ORG_2, rename, &Default::default()).await;
        assert!(matches!(other, Err(ServiceError::Authz(AuthzError::Permission(_)))));

        let upgrade = OrganizationPatch {
            subscription_plan: Some("enterprise".into()),
            ..Default::default()
        };
        let denied = service.update(org_admin, ORG_1, upgrade, &Default::default()).await;
        assert!(matches!(denied, Err(ServiceError::Authz(AuthzError::Permission(_)))));
    }

    #[tokio::test]
    async fn listing_follows_assignments() {
        let member = Uuid::new_v4();
        let store = seeded_store(&[member]).await;
        store.insert_assignment(assignment(member, Role::User, Some(ORG_2))).await;

        let listed = OrganizationService::new(&store).list(member).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, ORG_2);
    }

    #[tokio::test]
    async fn missing_organization_is_not_found_for_admins() {
        let admin = Uuid::new_v4();
        let store = seeded_store(&[admin]).await;
        store.insert_assignment(assignment(admin, Role::SystemAdmin, None)).await;

        let result = OrganizationService::new(&store).get(admin, Uuid::new_v4()).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }
}
