use std::fmt;

use serde::{Deserialize, Serialize};

use super::catalog::{Permission, Role};

/// A single named access requirement, evaluated server-side by the resolver
/// and client-side against a permission snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Requirement {
    Permission(Permission),
    AnyPermission(Vec<Permission>),
    /// Never satisfied by an empty list unless the caller is a system administrator
    AllPermissions(Vec<Permission>),
    Role(Role),
    AnyRole(Vec<Role>),
    SystemAdmin,
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join<T: fmt::Display>(items: &[T], sep: &str) -> String {
            items.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(sep)
        }

        match self {
            Requirement::Permission(p) => write!(f, "permission '{}'", p),
            Requirement::AnyPermission(ps) => write!(f, "any of permissions [{}]", join(ps, ", ")),
            Requirement::AllPermissions(ps) => write!(f, "all of permissions [{}]", join(ps, ", ")),
            Requirement::Role(r) => write!(f, "role '{}'", r),
            Requirement::AnyRole(rs) => write!(f, "any of roles [{}]", join(rs, ", ")),
            Requirement::SystemAdmin => write!(f, "role '{}'", Role::SystemAdmin),
        }
    }
}
