use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bumped whenever a permission is added or a role's grant list changes.
/// Shipped in the permission snapshot so clients can detect a stale cache.
pub const CATALOG_VERSION: u32 = 1;

/// Atomic capability checked at an operation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    // System scope
    ManageOrganizations,
    ManageSystemUsers,
    ViewSystemAnalytics,
    ManageSystemSettings,
    ViewAuditLogs,

    // Organization scope
    ManageOrgUsers,
    ManageOrgApis,
    ViewOrgAnalytics,
    ManageOrgSettings,

    // Self service
    AccessApis,
    ViewOwnAnalytics,
    ManageOwnProfile,
}

impl Permission {
    pub const ALL: [Permission; 12] = [
        Permission::ManageOrganizations,
        Permission::ManageSystemUsers,
        Permission::ViewSystemAnalytics,
        Permission::ManageSystemSettings,
        Permission::ViewAuditLogs,
        Permission::ManageOrgUsers,
        Permission::ManageOrgApis,
        Permission::ViewOrgAnalytics,
        Permission::ManageOrgSettings,
        Permission::AccessApis,
        Permission::ViewOwnAnalytics,
        Permission::ManageOwnProfile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ManageOrganizations => "manage_organizations",
            Permission::ManageSystemUsers => "manage_system_users",
            Permission::ViewSystemAnalytics => "view_system_analytics",
            Permission::ManageSystemSettings => "manage_system_settings",
            Permission::ViewAuditLogs => "view_audit_logs",
            Permission::ManageOrgUsers => "manage_org_users",
            Permission::ManageOrgApis => "manage_org_apis",
            Permission::ViewOrgAnalytics => "view_org_analytics",
            Permission::ManageOrgSettings => "manage_org_settings",
            Permission::AccessApis => "access_apis",
            Permission::ViewOwnAnalytics => "view_own_analytics",
            Permission::ManageOwnProfile => "manage_own_profile",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown permission '{0}'")]
pub struct UnknownPermission(pub String);

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

/// Role tiers. SYSTEM_ADMIN satisfies every check regardless of the table below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SystemAdmin,
    OrgAdmin,
    User,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::SystemAdmin, Role::OrgAdmin, Role::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SystemAdmin => "SYSTEM_ADMIN",
            Role::OrgAdmin => "ORG_ADMIN",
            Role::User => "USER",
        }
    }

    /// Permissions implied by holding this role.
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Role::SystemAdmin => &Permission::ALL,
            Role::OrgAdmin => ORG_ADMIN_PERMISSIONS,
            Role::User => USER_PERMISSIONS,
        }
    }

    pub fn grants(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .copied()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

const ORG_ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::ManageOrgUsers,
    Permission::ManageOrgApis,
    Permission::ViewOrgAnalytics,
    Permission::ManageOrgSettings,
    Permission::AccessApis,
    Permission::ViewOwnAnalytics,
    Permission::ManageOwnProfile,
];

const USER_PERMISSIONS: &[Permission] = &[
    Permission::AccessApis,
    Permission::ViewOwnAnalytics,
    Permission::ManageOwnProfile,
];
