use uuid::Uuid;

use crate::database::{PanelStore, StoreError};
use crate::permissions::{AuthorizationGate, PermissionSnapshot};

/// Resolve the permission snapshot handed to clients.
///
/// System administrators see every organization; everyone else sees the
/// organizations their live assignments reference.
pub async fn permission_snapshot(store: &dyn PanelStore, caller_id: Uuid) -> Result<PermissionSnapshot, StoreError> {
    let context = AuthorizationGate::new(store).load_context(caller_id).await?;
    let resolver = context.resolver();

    let organizations = if resolver.is_system_admin() {
        store.list_organizations(None).await?
    } else {
        let ids: Vec<Uuid> = resolver.organization_ids().into_iter().collect();
        if ids.is_empty() {
            Vec::new()
        } else {
            store.list_organizations(Some(&ids)).await?
        }
    };

    tracing::debug!(
        caller = %caller_id,
        "Resolved snapshot over {} assignments, {} organizations",
        context.assignments().len(),
        organizations.len()
    );

    Ok(PermissionSnapshot::resolve(&resolver, organizations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{Permission, Role};
    use crate::testing::{assignment, seeded_store, FailingStore, ORG_1, ORG_2};

    #[tokio::test]
    async fn org_admin_sees_only_their_organization() {
        let caller = Uuid::new_v4();
        let store = seeded_store(&[caller]).await;
        store.insert_assignment(assignment(caller, Role::OrgAdmin, Some(ORG_1))).await;

        let snapshot = permission_snapshot(&store, caller).await.unwrap();
        assert!(!snapshot.is_system_admin);
        assert_eq!(snapshot.organizations.len(), 1);
        assert_eq!(snapshot.organizations[0].id, ORG_1);
        assert!(snapshot.has_permission(Permission::ManageOrgUsers, Some(ORG_1)));
        assert!(!snapshot.has_permission(Permission::ManageOrgUsers, Some(ORG_2)));
    }

    #[tokio::test]
    async fn system_admin_sees_everything() {
        let caller = Uuid::new_v4();
        let store = seeded_store(&[caller]).await;
        store.insert_assignment(assignment(caller, Role::SystemAdmin, None)).await;

        let snapshot = permission_snapshot(&store, caller).await.unwrap();
        assert!(snapshot.is_system_admin);
        assert_eq!(snapshot.organizations.len(), 2);
        assert_eq!(snapshot.permissions.len(), Permission::ALL.len());
    }

    #[tokio::test]
    async fn no_assignments_means_empty_snapshot() {
        let caller = Uuid::new_v4();
        let store = seeded_store(&[caller]).await;

        let snapshot = permission_snapshot(&store, caller).await.unwrap();
        assert!(snapshot.permissions.is_empty());
        assert!(snapshot.roles.is_empty());
        assert!(snapshot.organizations.is_empty());
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        assert!(permission_snapshot(&FailingStore, Uuid::new_v4()).await.is_err());
    }
}
