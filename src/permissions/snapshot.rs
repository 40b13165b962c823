use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::catalog::{Permission, Role, CATALOG_VERSION};
use super::requirement::Requirement;
use super::resolver::PermissionResolver;
use crate::database::models::Organization;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleSummary {
    pub role_type: Role,
    pub organization_id: Option<Uuid>,
}

/// Server-resolved permission state for one caller, shipped to clients.
///
/// Clients answer every question from this value alone; the role hierarchy
/// never leaves the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSnapshot {
    pub permissions: BTreeSet<Permission>,
    pub roles: Vec<RoleSummary>,
    pub organizations: Vec<Organization>,
    pub is_system_admin: bool,
    /// Permissions from unscoped assignments; applies to organizations not listed below
    #[serde(default)]
    pub global_permissions: BTreeSet<Permission>,
    #[serde(default)]
    pub organization_permissions: BTreeMap<Uuid, BTreeSet<Permission>>,
    #[serde(default)]
    pub catalog_version: u32,
}

impl PermissionSnapshot {
    pub fn empty() -> Self {
        Self {
            permissions: BTreeSet::new(),
            roles: Vec::new(),
            organizations: Vec::new(),
            is_system_admin: false,
            global_permissions: BTreeSet::new(),
            organization_permissions: BTreeMap::new(),
            catalog_version: CATALOG_VERSION,
        }
    }

    pub fn resolve(resolver: &PermissionResolver<'_>, organizations: Vec<Organization>) -> Self {
        let organization_permissions = resolver
            .organization_ids()
            .into_iter()
            .map(|id| (id, resolver.effective_permissions_in(Some(id))))
            .collect();

        Self {
            permissions: resolver.effective_permissions(),
            roles: resolver.roles(),
            organizations,
            is_system_admin: resolver.is_system_admin(),
            global_permissions: resolver.global_permissions(),
            organization_permissions,
            catalog_version: CATALOG_VERSION,
        }
    }

    fn permissions_in(&self, organization_id: Option<Uuid>) -> &BTreeSet<Permission> {
        match organization_id {
            None => &self.permissions,
            Some(id) => self
                .organization_permissions
                .get(&id)
                .unwrap_or(&self.global_permissions),
        }
    }

    pub fn has_permission(&self, permission: Permission, organization_id: Option<Uuid>) -> bool {
        self.is_system_admin || self.permissions_in(organization_id).contains(&permission)
    }

    pub fn has_role(&self, role: Role, organization_id: Option<Uuid>) -> bool {
        if self.is_system_admin {
            return true;
        }
        self.roles.iter().any(|r| {
            r.role_type == role
                && match (organization_id, r.organization_id) {
                    (Some(wanted), Some(own)) => wanted == own,
                    _ => true,
                }
        })
    }

    /// Same rules as the server resolver: admins pass everything, an empty
    /// `AllPermissions` list passes nobody else.
    pub fn satisfies(&self, requirement: &Requirement, organization_id: Option<Uuid>) -> bool {
        if self.is_system_admin {
            return true;
        }
        match requirement {
            Requirement::Permission(p) => self.has_permission(*p, organization_id),
            Requirement::AnyPermission(ps) => ps.iter().any(|p| self.has_permission(*p, organization_id)),
            Requirement::AllPermissions(ps) => {
                !ps.is_empty() && ps.iter().all(|p| self.has_permission(*p, organization_id))
            }
            Requirement::Role(r) => self.has_role(*r, organization_id),
            Requirement::AnyRole(rs) => rs.iter().any(|r| self.has_role(*r, organization_id)),
            Requirement::SystemAdmin => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{assignment, ORG_1, ORG_2};

    fn snapshot_for(assignments: &[crate::database::models::RoleAssignment]) -> PermissionSnapshot {
        PermissionSnapshot::resolve(&PermissionResolver::new(assignments), Vec::new())
    }

    #[test]
    fn snapshot_answers_match_the_resolver() {
        let user = Uuid::new_v4();
        let assignments = vec![
            assignment(user, Role::OrgAdmin, Some(ORG_1)),
            assignment(user, Role::User, None).with_permissions([Permission::ViewSystemAnalytics]),
        ];
        let resolver = PermissionResolver::new(&assignments);
        let snapshot = snapshot_for(&assignments);
        let stranger = Some(Uuid::new_v4());

        for permission in Permission::ALL {
            for org in [None, Some(ORG_1), Some(ORG_2), stranger] {
                assert_eq!(
                    snapshot.has_permission(permission, org),
                    resolver.has_permission(permission, org),
                    "{permission} in {org:?}"
                );
            }
        }
        for role in Role::ALL {
            for org in [None, Some(ORG_1), Some(ORG_2)] {
                assert_eq!(snapshot.has_role(role, org), resolver.has_role(role, org), "{role} in {org:?}");
            }
        }
    }

    #[test]
    fn empty_snapshot_denies() {
        let snapshot = PermissionSnapshot::empty();
        assert!(!snapshot.has_permission(Permission::AccessApis, None));
        assert!(!snapshot.has_role(Role::User, Some(ORG_1)));
        assert!(!snapshot.satisfies(&Requirement::AnyRole(Role::ALL.to_vec()), None));
    }

    #[test]
    fn wire_shape_uses_camel_case_keys() {
        let snapshot = snapshot_for(&[assignment(Uuid::new_v4(), Role::OrgAdmin, Some(ORG_1))]);
        let value = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(value["isSystemAdmin"], false);
        assert_eq!(value["roles"][0]["role_type"], "ORG_ADMIN");
        assert_eq!(value["roles"][0]["organization_id"], ORG_1.to_string());
        assert!(value["permissions"].as_array().unwrap().contains(&"manage_org_users".into()));
        assert!(value["organizationPermissions"][ORG_1.to_string()].is_array());
    }
}
