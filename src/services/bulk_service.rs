use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::models::{AuditEvent, NewGrant};
use crate::database::{PanelStore, StoreError};
use crate::error::{ApiError, ValidationError};
use crate::middleware::RequestProvenance;
use crate::permissions::{AuthorizationContext, AuthorizationGate, AuthzError, Permission, Role};
use crate::types::Lifecycle;

/// `{ "userIds": [...], "action": "...", ...action fields }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequest {
    pub user_ids: Vec<Uuid>,
    #[serde(flatten)]
    pub action: BulkAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BulkAction {
    Activate,
    Deactivate,
    #[serde(rename_all = "camelCase")]
    AssignRole {
        #[serde(default)]
        organization_id: Option<Uuid>,
        #[serde(default)]
        role: Option<Role>,
        #[serde(default)]
        permissions: Vec<Permission>,
        #[serde(default)]
        expires_at: Option<DateTime<Utc>>,
    },
    #[serde(rename_all = "camelCase")]
    RemoveRoles {
        #[serde(default)]
        organization_id: Option<Uuid>,
        #[serde(default)]
        role: Option<Role>,
    },
    Delete,
}

impl BulkAction {
    pub fn name(&self) -> &'static str {
        match self {
            BulkAction::Activate => "activate",
            BulkAction::Deactivate => "deactivate",
            BulkAction::AssignRole { .. } => "assign_role",
            BulkAction::RemoveRoles { .. } => "remove_roles",
            BulkAction::Delete => "delete",
        }
    }

    fn organization_id(&self) -> Option<Uuid> {
        match self {
            BulkAction::AssignRole { organization_id, .. } | BulkAction::RemoveRoles { organization_id, .. } => {
                *organization_id
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkOutcome {
    pub processed: u64,
    pub failed: u64,
    pub details: Value,
}

#[derive(Debug, Error)]
pub enum BulkError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<BulkError> for ApiError {
    fn from(err: BulkError) -> Self {
        match err {
            BulkError::Validation(e) => e.into(),
            BulkError::Authz(e) => e.into(),
            BulkError::Store(e) => e.into(),
        }
    }
}

/// A request that passed validation: non-empty, bounded, deduplicated,
/// with every parameter its action needs.
#[derive(Debug, Clone)]
struct ValidBulk {
    user_ids: Vec<Uuid>,
    action: BulkAction,
}

/// Multi-target administrative mutations over profiles and role assignments
pub struct BulkService<'a> {
    store: &'a dyn PanelStore,
    max_targets: usize,
}

impl<'a> BulkService<'a> {
    pub fn new(store: &'a dyn PanelStore, max_targets: usize) -> Self {
        Self { store, max_targets }
    }

    pub async fn execute(
        &self,
        caller_id: Uuid,
        request: BulkRequest,
        provenance: &RequestProvenance,
    ) -> Result<BulkOutcome, BulkError> {
        let bulk = self.validate(caller_id, request)?;
        let action = bulk.action.name();

        let context = AuthorizationGate::new(self.store).load_context(caller_id).await?;
        authorize(&context, &bulk.action)?;

        info!(
            caller = %caller_id,
            "Bulk {} over {} targets",
            action,
            bulk.user_ids.len()
        );

        let outcome = match &bulk.action {
            BulkAction::Activate => self.set_state(&bulk.user_ids, Lifecycle::Active).await?,
            BulkAction::Deactivate => self.set_state(&bulk.user_ids, Lifecycle::Inactive).await?,
            BulkAction::AssignRole {
                organization_id,
                role: Some(role),
                permissions,
                expires_at,
            } => {
                let grant = NewGrant {
                    role: *role,
                    organization_id: *organization_id,
                    permissions: permissions.clone(),
                    expires_at: *expires_at,
                    granted_by: caller_id,
                };
                self.assign_role(&bulk.user_ids, &grant).await?
            }
            BulkAction::RemoveRoles { organization_id, role } => {
                if role.is_none() {
                    self.guard_system_admin_rows(&context, &bulk.user_ids, *organization_id)
                        .await?;
                }
                self.remove_roles(&bulk.user_ids, *organization_id, *role).await?
            }
            BulkAction::Delete => self.delete(&bulk.user_ids).await?,
            BulkAction::AssignRole { role: None, .. } => {
                return Err(ValidationError::field("role", "role is required for assign_role").into())
            }
        };

        let event = AuditEvent::new(caller_id, format!("bulk_{}", action), "user")
            .organization(bulk.action.organization_id())
            .values(
                None,
                Some(json!({
                    "userIds": bulk.user_ids,
                    "request": bulk.action,
                    "processed": outcome.processed,
                    "failed": outcome.failed,
                    "details": outcome.details,
                })),
            )
            .provenance(provenance);
        self.store.record(event).await?;

        Ok(outcome)
    }

    fn validate(&self, caller_id: Uuid, request: BulkRequest) -> Result<ValidBulk, ValidationError> {
        if request.user_ids.is_empty() {
            return Err(ValidationError::field("userIds", "At least one user id is required"));
        }

        let mut seen = HashSet::new();
        let user_ids: Vec<Uuid> = request.user_ids.into_iter().filter(|id| seen.insert(*id)).collect();

        if user_ids.len() > self.max_targets {
            warn!("Bulk request rejected: {} targets exceeds {}", user_ids.len(), self.max_targets);
            return Err(ValidationError::field(
                "userIds",
                format!("At most {} users may be targeted at once", self.max_targets),
            ));
        }

        match &request.action {
            BulkAction::AssignRole { role: None, .. } => {
                return Err(ValidationError::field("role", "role is required for assign_role"));
            }
            BulkAction::AssignRole {
                role: Some(role),
                organization_id: None,
                ..
            } if *role != Role::SystemAdmin => {
                return Err(ValidationError::field(
                    "organizationId",
                    format!("organizationId is required to assign {}", role),
                ));
            }
            BulkAction::RemoveRoles { organization_id: None, .. } => {
                return Err(ValidationError::field(
                    "organizationId",
                    "organizationId is required for remove_roles",
                ));
            }
            BulkAction::AssignRole { expires_at: Some(at), .. } if *at <= Utc::now() => {
                return Err(ValidationError::field("expiresAt", "expiresAt must be in the future"));
            }
            BulkAction::Deactivate | BulkAction::Delete if user_ids.contains(&caller_id) => {
                return Err(ValidationError::field(
                    "userIds",
                    format!("You cannot {} your own account", request.action.name()),
                ));
            }
            _ => {}
        }

        Ok(ValidBulk {
            user_ids,
            action: request.action,
        })
    }

    async fn set_state(&self, user_ids: &[Uuid], state: Lifecycle) -> Result<BulkOutcome, StoreError> {
        let updated = self.store.set_profiles_state(user_ids, state).await?;
        let requested = user_ids.len() as u64;

        Ok(BulkOutcome {
            processed: updated,
            failed: requested.saturating_sub(updated),
            details: json!({ "requested": requested, "state": state }),
        })
    }

    async fn assign_role(&self, user_ids: &[Uuid], grant: &NewGrant) -> Result<BulkOutcome, StoreError> {
        let holders = self
            .store
            .holders_of_role(user_ids, grant.organization_id, grant.role)
            .await?;
        let new_targets: Vec<Uuid> = user_ids.iter().copied().filter(|id| !holders.contains(id)).collect();

        let inserted = if new_targets.is_empty() {
            0
        } else {
            self.store.grant_role(&new_targets, grant).await?
        };

        Ok(BulkOutcome {
            processed: inserted,
            failed: (new_targets.len() as u64).saturating_sub(inserted),
            details: json!({
                "role": grant.role,
                "organizationId": grant.organization_id,
                "alreadyHadRole": holders.len(),
            }),
        })
    }

    /// Stripping every role in an organization also strips SYSTEM_ADMIN rows
    /// scoped there, which only a system administrator may do.
    async fn guard_system_admin_rows(
        &self,
        context: &AuthorizationContext,
        user_ids: &[Uuid],
        organization_id: Option<Uuid>,
    ) -> Result<(), BulkError> {
        if context.is_system_admin() {
            return Ok(());
        }
        let admins = self
            .store
            .holders_of_role(user_ids, organization_id, Role::SystemAdmin)
            .await?;
        if !admins.is_empty() {
            context.require_system_admin().map_err(AuthzError::from)?;
        }
        Ok(())
    }

    async fn remove_roles(
        &self,
        user_ids: &[Uuid],
        organization_id: Option<Uuid>,
        role: Option<Role>,
    ) -> Result<BulkOutcome, StoreError> {
        let deactivated = self
            .store
            .deactivate_assignments(user_ids, organization_id, role)
            .await?;

        Ok(BulkOutcome {
            processed: user_ids.len() as u64,
            failed: 0,
            details: json!({
                "organizationId": organization_id,
                "role": role,
                "assignmentsRemoved": deactivated,
            }),
        })
    }

    async fn delete(&self, user_ids: &[Uuid]) -> Result<BulkOutcome, StoreError> {
        let protected = self.store.system_admins_among(user_ids).await?;
        let deletable: Vec<Uuid> = user_ids.iter().copied().filter(|id| !protected.contains(id)).collect();

        if !protected.is_empty() {
            warn!("Bulk delete skipped {} system administrators", protected.len());
        }

        let (deactivated, assignments) = if deletable.is_empty() {
            (0, 0)
        } else {
            let deactivated = self.store.set_profiles_state(&deletable, Lifecycle::Inactive).await?;
            let assignments = self.store.deactivate_assignments(&deletable, None, None).await?;
            (deactivated, assignments)
        };

        let mut protected_ids: Vec<Uuid> = protected.into_iter().collect();
        protected_ids.sort();

        Ok(BulkOutcome {
            processed: deletable.len() as u64,
            failed: 0,
            details: json!({
                "protected": protected_ids.len(),
                "protectedIds": protected_ids,
                "profilesDeactivated": deactivated,
                "assignmentsRemoved": assignments,
            }),
        })
    }
}

/// Upstream gate for each bulk action
fn authorize(context: &AuthorizationContext, action: &BulkAction) -> Result<(), AuthzError> {
    match action {
        BulkAction::Activate | BulkAction::Deactivate | BulkAction::Delete => {
            context.require_permission(Permission::ManageSystemUsers, None)?
        }
        BulkAction::AssignRole {
            organization_id,
            role,
            permissions,
            ..
        } => match role {
            Some(role) => context.require_grant(*role, *organization_id, permissions)?,
            None => context.require_permission(Permission::ManageOrgUsers, *organization_id)?,
        },
        BulkAction::RemoveRoles { organization_id, role } => {
            context.require_permission(Permission::ManageOrgUsers, *organization_id)?;
            if *role == Some(Role::SystemAdmin) {
                context.require_system_admin()?;
            }
        }
    }
    Ok(())
}
