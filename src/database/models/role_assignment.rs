use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::permissions::{Permission, Role};
use crate::types::Lifecycle;

/// One grant of a role to a user, optionally scoped to one organization.
/// `organization_id == None` is a global grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub organization_id: Option<Uuid>,
    /// Explicit permissions granted on top of the role hierarchy
    #[serde(default)]
    pub permissions: Vec<Permission>,
    pub state: Lifecycle,
    pub expires_at: Option<DateTime<Utc>>,
    pub granted_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl RoleAssignment {
    pub fn new(user_id: Uuid, role: Role, organization_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            role,
            organization_id,
            permissions: Vec::new(),
            state: Lifecycle::Active,
            expires_at: None,
            granted_by: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.permissions = permissions.into_iter().collect();
        self
    }

    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn granted_by(mut self, granted_by: Uuid) -> Self {
        self.granted_by = Some(granted_by);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.state = Lifecycle::Inactive;
        self
    }

    /// Active and not yet expired. An assignment expiring exactly at `now` is expired.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.state.is_active() && self.expires_at.map_or(true, |expires_at| expires_at > now)
    }

    /// Whether this assignment is visible to a check scoped to `organization_id`.
    /// Global assignments apply everywhere; unscoped checks see every assignment.
    pub fn applies_to(&self, organization_id: Option<Uuid>) -> bool {
        match (organization_id, self.organization_id) {
            (Some(wanted), Some(own)) => wanted == own,
            _ => true,
        }
    }

    pub fn grants(&self, permission: Permission) -> bool {
        self.role.grants(permission) || self.permissions.contains(&permission)
    }
}

/// Parameters shared by every row of a (bulk) role grant.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGrant {
    pub role: Role,
    pub organization_id: Option<Uuid>,
    pub permissions: Vec<Permission>,
    pub expires_at: Option<DateTime<Utc>>,
    pub granted_by: Uuid,
}

impl NewGrant {
    pub fn to_assignment(&self, user_id: Uuid) -> RoleAssignment {
        let mut assignment = RoleAssignment::new(user_id, self.role, self.organization_id)
            .with_permissions(self.permissions.iter().copied())
            .granted_by(self.granted_by);
        assignment.expires_at = self.expires_at;
        assignment
    }
}

/// Raw `user_roles` row; role and permission columns are stored as text.
#[derive(Debug, FromRow)]
pub struct RoleAssignmentRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub role_type: String,
    pub permissions: Option<Vec<String>>,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub granted_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl RoleAssignmentRow {
    /// Rows with an unrecognised role are dropped; unrecognised explicit
    /// permissions are dropped individually. Neither ever widens access.
    pub fn into_assignment(self) -> Option<RoleAssignment> {
        let role = match self.role_type.parse::<Role>() {
            Ok(role) => role,
            Err(e) => {
                tracing::warn!("Ignoring role assignment {}: {}", self.id, e);
                return None;
            }
        };

        let permissions = self
            .permissions
            .unwrap_or_default()
            .into_iter()
            .filter_map(|raw| match raw.parse::<Permission>() {
                Ok(permission) => Some(permission),
                Err(e) => {
                    tracing::warn!("Ignoring explicit permission on assignment {}: {}", self.id, e);
                    None
                }
            })
            .collect();

        Some(RoleAssignment {
            id: self.id,
            user_id: self.user_id,
            role,
            organization_id: self.organization_id,
            permissions,
            state: Lifecycle::from_flag(self.is_active),
            expires_at: self.expires_at,
            granted_by: self.granted_by,
            created_at: self.created_at,
        })
    }
}
