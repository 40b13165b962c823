use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::catalog::{Permission, Role};
use super::requirement::Requirement;
use super::snapshot::RoleSummary;
use crate::database::models::RoleAssignment;

/// Pure evaluation of a caller's role assignments at a fixed instant.
///
/// Never fails: an empty or fully expired assignment list is a well-defined
/// deny-everything state. A live SYSTEM_ADMIN assignment satisfies every
/// query before organization scoping is considered.
#[derive(Debug, Clone, Copy)]
pub struct PermissionResolver<'a> {
    assignments: &'a [RoleAssignment],
    now: DateTime<Utc>,
}

impl<'a> PermissionResolver<'a> {
    pub fn new(assignments: &'a [RoleAssignment]) -> Self {
        Self::at(assignments, Utc::now())
    }

    pub fn at(assignments: &'a [RoleAssignment], now: DateTime<Utc>) -> Self {
        Self { assignments, now }
    }

    pub fn live_assignments(&self) -> impl Iterator<Item = &'a RoleAssignment> + '_ {
        self.assignments.iter().filter(move |a| a.is_live_at(self.now))
    }

    fn scoped(&self, organization_id: Option<Uuid>) -> impl Iterator<Item = &'a RoleAssignment> + '_ {
        self.live_assignments().filter(move |a| a.applies_to(organization_id))
    }

    pub fn is_system_admin(&self) -> bool {
        self.live_assignments().any(|a| a.role == Role::SystemAdmin)
    }

    pub fn has_permission(&self, permission: Permission, organization_id: Option<Uuid>) -> bool {
        if self.is_system_admin() {
            return true;
        }
        self.scoped(organization_id).any(|a| a.grants(permission))
    }

    pub fn has_any_permission(&self, permissions: &[Permission], organization_id: Option<Uuid>) -> bool {
        if self.is_system_admin() {
            return true;
        }
        permissions.iter().any(|p| self.has_permission(*p, organization_id))
    }

    /// An empty list grants nothing, except to a system administrator, who
    /// passes every check.
    pub fn has_all_permissions(&self, permissions: &[Permission], organization_id: Option<Uuid>) -> bool {
        if self.is_system_admin() {
            return true;
        }
        !permissions.is_empty() && permissions.iter().all(|p| self.has_permission(*p, organization_id))
    }

    pub fn has_role(&self, role: Role, organization_id: Option<Uuid>) -> bool {
        if self.is_system_admin() {
            return true;
        }
        self.scoped(organization_id).any(|a| a.role == role)
    }

    pub fn has_any_role(&self, roles: &[Role], organization_id: Option<Uuid>) -> bool {
        if self.is_system_admin() {
            return true;
        }
        roles.iter().any(|r| self.has_role(*r, organization_id))
    }

    pub fn satisfies(&self, requirement: &Requirement, organization_id: Option<Uuid>) -> bool {
        match requirement {
            Requirement::Permission(p) => self.has_permission(*p, organization_id),
            Requirement::AnyPermission(ps) => self.has_any_permission(ps, organization_id),
            Requirement::AllPermissions(ps) => self.has_all_permissions(ps, organization_id),
            Requirement::Role(r) => self.has_role(*r, organization_id),
            Requirement::AnyRole(rs) => self.has_any_role(rs, organization_id),
            Requirement::SystemAdmin => self.is_system_admin(),
        }
    }

    /// Union of hierarchy and explicit permissions across every live assignment.
    pub fn effective_permissions(&self) -> BTreeSet<Permission> {
        Self::collect(self.live_assignments())
    }

    /// The effective set an organization-scoped query can see: live
    /// assignments that are global or belong to `organization_id`.
    pub fn effective_permissions_in(&self, organization_id: Option<Uuid>) -> BTreeSet<Permission> {
        if self.is_system_admin() {
            return Permission::ALL.into_iter().collect();
        }
        Self::collect(self.scoped(organization_id))
    }

    /// Permissions from global (unscoped) assignments only.
    pub fn global_permissions(&self) -> BTreeSet<Permission> {
        if self.is_system_admin() {
            return Permission::ALL.into_iter().collect();
        }
        Self::collect(self.live_assignments().filter(|a| a.organization_id.is_none()))
    }

    pub fn organization_ids(&self) -> BTreeSet<Uuid> {
        self.live_assignments().filter_map(|a| a.organization_id).collect()
    }

    pub fn roles(&self) -> Vec<RoleSummary> {
        let unique: BTreeSet<(Role, Option<Uuid>)> = self
            .live_assignments()
            .map(|a| (a.role, a.organization_id))
            .collect();
        unique
            .into_iter()
            .map(|(role_type, organization_id)| RoleSummary { role_type, organization_id })
            .collect()
    }

    fn collect<'b>(assignments: impl Iterator<Item = &'b RoleAssignment>) -> BTreeSet<Permission> {
        let mut set = BTreeSet::new();
        for assignment in assignments {
            set.extend(assignment.role.permissions().iter().copied());
            set.extend(assignment.permissions.iter().copied());
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::PermissionSnapshot;
    use crate::testing::{assignment, ORG_1, ORG_2};
    use chrono::Duration;

    fn user() -> Uuid {
        Uuid::new_v4()
    }

    #[test]
    fn empty_assignments_deny_everything() {
        let resolver = PermissionResolver::new(&[]);
        assert!(resolver.effective_permissions().is_empty());
        for permission in Permission::ALL {
            assert!(!resolver.has_permission(permission, None));
            assert!(!resolver.has_permission(permission, Some(ORG_1)));
        }
        for role in Role::ALL {
            assert!(!resolver.has_role(role, None));
        }
        assert!(!resolver.has_any_role(&Role::ALL, None));
        assert!(!resolver.is_system_admin());
    }

    #[test]
    fn system_admin_overrides_every_check_in_every_organization() {
        let assignments = vec![assignment(user(), Role::SystemAdmin, None)];
        let resolver = PermissionResolver::new(&assignments);
        let stranger_org = Uuid::new_v4();

        for permission in Permission::ALL {
            assert!(resolver.has_permission(permission, None));
            assert!(resolver.has_permission(permission, Some(stranger_org)));
        }
        for role in Role::ALL {
            assert!(resolver.has_role(role, Some(stranger_org)));
        }
        assert!(resolver.has_all_permissions(&[], Some(stranger_org)));
        assert!(resolver.satisfies(&Requirement::SystemAdmin, None));
    }

    #[test]
    fn org_scoped_system_admin_still_overrides_other_organizations() {
        let assignments = vec![assignment(user(), Role::SystemAdmin, Some(ORG_1))];
        let resolver = PermissionResolver::new(&assignments);
        assert!(resolver.has_permission(Permission::ManageSystemUsers, Some(ORG_2)));
    }

    #[test]
    fn inactive_and_expired_assignments_contribute_nothing() {
        let now = Utc::now();
        let id = user();
        let assignments = vec![
            assignment(id, Role::SystemAdmin, None).inactive(),
            assignment(id, Role::OrgAdmin, Some(ORG_1)).expiring_at(now - Duration::minutes(5)),
            assignment(id, Role::User, None).expiring_at(now),
        ];
        let resolver = PermissionResolver::at(&assignments, now);

        for permission in Permission::ALL {
            assert!(!resolver.has_permission(permission, None));
            assert!(!resolver.has_permission(permission, Some(ORG_1)));
        }
        assert!(resolver.effective_permissions().is_empty());
        assert!(resolver.roles().is_empty());
    }

    #[test]
    fn org_admin_scenario() {
        let assignments = vec![assignment(user(), Role::OrgAdmin, Some(ORG_1))];
        let resolver = PermissionResolver::new(&assignments);

        assert!(resolver.has_permission(Permission::ManageOrgUsers, Some(ORG_1)));
        assert!(!resolver.has_permission(Permission::ManageOrgUsers, Some(ORG_2)));
        assert!(!resolver.has_permission(Permission::ManageSystemUsers, Some(ORG_1)));
    }

    #[test]
    fn no_cross_organization_leakage() {
        let assignments = vec![assignment(user(), Role::OrgAdmin, Some(ORG_1))];
        let resolver = PermissionResolver::new(&assignments);

        for permission in Role::OrgAdmin.permissions() {
            assert!(resolver.has_permission(*permission, Some(ORG_1)));
            assert!(!resolver.has_permission(*permission, Some(ORG_2)));
        }
        assert!(resolver.has_role(Role::OrgAdmin, Some(ORG_1)));
        assert!(!resolver.has_role(Role::OrgAdmin, Some(ORG_2)));
    }

    #[test]
    fn per_assignment_scoping_with_mixed_roles() {
        let id = user();
        let assignments = vec![
            assignment(id, Role::OrgAdmin, Some(ORG_1)),
            assignment(id, Role::User, Some(ORG_2)),
        ];
        let resolver = PermissionResolver::new(&assignments);

        assert!(resolver.has_permission(Permission::AccessApis, Some(ORG_2)));
        assert!(!resolver.has_permission(Permission::ManageOrgApis, Some(ORG_2)));
        assert!(resolver.has_permission(Permission::ManageOrgApis, Some(ORG_1)));
        // Unscoped checks see the union
        assert!(resolver.has_permission(Permission::ManageOrgApis, None));
    }

    #[test]
    fn global_assignment_applies_in_every_organization() {
        let assignments = vec![assignment(user(), Role::OrgAdmin, None)];
        let resolver = PermissionResolver::new(&assignments);
        assert!(resolver.has_permission(Permission::ManageOrgSettings, Some(ORG_2)));
        assert_eq!(resolver.global_permissions().len(), Role::OrgAdmin.permissions().len());
    }

    #[test]
    fn same_organization_assignments_union() {
        let id = user();
        let assignments = vec![
            assignment(id, Role::User, Some(ORG_1)).with_permissions([Permission::ViewOrgAnalytics]),
            assignment(id, Role::User, Some(ORG_1)).with_permissions([Permission::ManageOrgApis]),
        ];
        let resolver = PermissionResolver::new(&assignments);

        let mut expected: BTreeSet<Permission> = Role::User.permissions().iter().copied().collect();
        expected.insert(Permission::ViewOrgAnalytics);
        expected.insert(Permission::ManageOrgApis);

        assert_eq!(resolver.effective_permissions(), expected);
        assert_eq!(resolver.effective_permissions_in(Some(ORG_1)), expected);
        assert!(resolver.effective_permissions_in(Some(ORG_2)).is_empty());
    }

    #[test]
    fn explicit_permissions_are_organization_scoped_too() {
        let assignments = vec![
            assignment(user(), Role::User, Some(ORG_1)).with_permissions([Permission::ViewAuditLogs]),
        ];
        let resolver = PermissionResolver::new(&assignments);
        assert!(resolver.has_permission(Permission::ViewAuditLogs, Some(ORG_1)));
        assert!(!resolver.has_permission(Permission::ViewAuditLogs, Some(ORG_2)));
    }

    #[test]
    fn expiry_boundary() {
        let now = Utc::now();
        let id = user();
        let at = |expires_at| vec![assignment(id, Role::OrgAdmin, Some(ORG_1)).expiring_at(expires_at)];

        let exact = at(now);
        let before = at(now - Duration::seconds(1));
        let after = at(now + Duration::seconds(1));

        assert!(!PermissionResolver::at(&exact, now).has_permission(Permission::ManageOrgUsers, Some(ORG_1)));
        assert!(!PermissionResolver::at(&before, now).has_permission(Permission::ManageOrgUsers, Some(ORG_1)));
        assert!(PermissionResolver::at(&after, now).has_permission(Permission::ManageOrgUsers, Some(ORG_1)));
    }

    #[test]
    fn combinators() {
        let assignments = vec![assignment(user(), Role::User, Some(ORG_1))];
        let resolver = PermissionResolver::new(&assignments);

        assert!(resolver.has_any_role(&[Role::OrgAdmin, Role::User], Some(ORG_1)));
        assert!(!resolver.has_any_role(&[Role::OrgAdmin, Role::SystemAdmin], Some(ORG_1)));
        assert!(resolver.has_all_permissions(&[Permission::AccessApis, Permission::ManageOwnProfile], Some(ORG_1)));
        assert!(!resolver.has_all_permissions(&[Permission::AccessApis, Permission::ManageOrgUsers], Some(ORG_1)));
        assert!(resolver.has_any_permission(&[Permission::ManageOrgUsers, Permission::AccessApis], Some(ORG_1)));
        assert!(!resolver.has_any_permission(&[], Some(ORG_1)));
        assert!(!resolver.has_all_permissions(&[], Some(ORG_1)));
    }

    #[test]
    fn empty_permission_list_grants_nothing_to_non_admins() {
        let member = vec![assignment(user(), Role::OrgAdmin, Some(ORG_1))];
        let resolver = PermissionResolver::new(&member);
        assert!(!resolver.has_all_permissions(&[], Some(ORG_1)));
        assert!(!resolver.has_all_permissions(&[], None));
        assert!(!resolver.satisfies(&Requirement::AllPermissions(Vec::new()), Some(ORG_1)));

        let admin = vec![assignment(user(), Role::SystemAdmin, None)];
        let resolver = PermissionResolver::new(&admin);
        assert!(resolver.has_all_permissions(&[], Some(ORG_1)));
        assert!(resolver.satisfies(&Requirement::AllPermissions(Vec::new()), None));

        let snapshot = PermissionSnapshot::resolve(&PermissionResolver::new(&member), Vec::new());
        assert!(!snapshot.satisfies(&Requirement::AllPermissions(Vec::new()), Some(ORG_1)));
    }

    #[test]
    fn roles_are_deduplicated_per_organization() {
        let id = user();
        let assignments = vec![
            assignment(id, Role::User, Some(ORG_1)),
            assignment(id, Role::User, Some(ORG_1)),
            assignment(id, Role::OrgAdmin, Some(ORG_2)),
        ];
        let resolver = PermissionResolver::new(&assignments);
        assert_eq!(resolver.roles().len(), 2);
        assert_eq!(resolver.organization_ids().len(), 2);
    }
}
