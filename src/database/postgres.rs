use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{
    AuditEvent, NewGrant, NewOrganization, Organization, OrganizationPatch, Profile, ProfileRow,
    RoleAssignment, RoleAssignmentRow,
};
use crate::database::store::{AssignmentStore, AuditLog, DirectoryStore, StoreError};
use crate::permissions::Role;
use crate::types::Lifecycle;

/// Postgres-backed store over the `profiles`, `organizations`, `user_roles`
/// and `audit_logs` tables.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

const ASSIGNMENT_COLUMNS: &str = "id, user_id, organization_id, role_type, permissions, is_active, expires_at, granted_by, created_at";
const ORGANIZATION_COLUMNS: &str = "id, name, slug, subscription_plan, max_users, max_apis, is_active, created_at, updated_at";
const LIVE: &str = "is_active = true AND (expires_at IS NULL OR expires_at > now())";

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn into_assignments(rows: Vec<RoleAssignmentRow>) -> Vec<RoleAssignment> {
        rows.into_iter().filter_map(RoleAssignmentRow::into_assignment).collect()
    }
}

fn map_unique_violation(err: sqlx::Error, what: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(what.to_string()),
        _ => StoreError::Sqlx(err),
    }
}

#[async_trait]
impl AssignmentStore for PgStore {
    async fn fetch_active_assignments(&self, user_id: Uuid) -> Result<Vec<RoleAssignment>, StoreError> {
        let query = format!(
            "SELECT {} FROM user_roles WHERE user_id = $1 AND {} ORDER BY created_at",
            ASSIGNMENT_COLUMNS, LIVE
        );
        let rows = sqlx::query_as::<_, RoleAssignmentRow>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(Self::into_assignments(rows))
    }

    async fn organization_assignments(&self, organization_id: Uuid) -> Result<Vec<RoleAssignment>, StoreError> {
        let query = format!(
            "SELECT {} FROM user_roles WHERE organization_id = $1 AND {} ORDER BY created_at",
            ASSIGNMENT_COLUMNS, LIVE
        );
        let rows = sqlx::query_as::<_, RoleAssignmentRow>(&query)
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(Self::into_assignments(rows))
    }

    async fn holders_of_role(
        &self,
        user_ids: &[Uuid],
        organization_id: Option<Uuid>,
        role: Role,
    ) -> Result<HashSet<Uuid>, StoreError> {
        let query = format!(
            "SELECT DISTINCT user_id FROM user_roles
             WHERE user_id = ANY($1) AND organization_id IS NOT DISTINCT FROM $2 AND role_type = $3 AND {}",
            LIVE
        );
        let ids: Vec<Uuid> = sqlx::query_scalar(&query)
            .bind(user_ids.to_vec())
            .bind(organization_id)
            .bind(role.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().collect())
    }

    async fn system_admins_among(&self, user_ids: &[Uuid]) -> Result<HashSet<Uuid>, StoreError> {
        let query = format!(
            "SELECT DISTINCT user_id FROM user_roles WHERE user_id = ANY($1) AND role_type = $2 AND {}",
            LIVE
        );
        let ids: Vec<Uuid> = sqlx::query_scalar(&query)
            .bind(user_ids.to_vec())
            .bind(Role::SystemAdmin.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().collect())
    }

    async fn grant_role(&self, user_ids: &[Uuid], grant: &NewGrant) -> Result<u64, StoreError> {
        if user_ids.is_empty() {
            return Ok(0);
        }
        let permissions: Vec<String> = grant.permissions.iter().map(|p| p.as_str().to_string()).collect();

        let result = sqlx::query(
            r#"
            INSERT INTO user_roles
                (id, user_id, organization_id, role_type, permissions, is_active, expires_at, granted_by)
            SELECT gen_random_uuid(), target.user_id, $2, $3, $4, true, $5, $6
            FROM UNNEST($1::uuid[]) AS target(user_id)
            "#,
        )
        .bind(user_ids.to_vec())
        .bind(grant.organization_id)
        .bind(grant.role.as_str())
        .bind(permissions)
        .bind(grant.expires_at)
        .bind(grant.granted_by)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn deactivate_assignments(
        &self,
        user_ids: &[Uuid],
        organization_id: Option<Uuid>,
        role: Option<Role>,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE user_roles SET is_active = false
            WHERE user_id = ANY($1)
              AND is_active = true
              AND ($2::uuid IS NULL OR organization_id = $2)
              AND ($3::text IS NULL OR role_type = $3)
            "#,
        )
        .bind(user_ids.to_vec())
        .bind(organization_id)
        .bind(role.map(|r| r.as_str()))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl DirectoryStore for PgStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_organizations(&self, ids: Option<&[Uuid]>) -> Result<Vec<Organization>, StoreError> {
        let query = format!(
            "SELECT {} FROM organizations WHERE ($1::uuid[] IS NULL OR id = ANY($1)) ORDER BY name",
            ORGANIZATION_COLUMNS
        );
        let organizations = sqlx::query_as::<_, Organization>(&query)
            .bind(ids.map(|ids| ids.to_vec()))
            .fetch_all(&self.pool)
            .await?;
        Ok(organizations)
    }

    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>, StoreError> {
        let query = format!("SELECT {} FROM organizations WHERE id = $1", ORGANIZATION_COLUMNS);
        let organization = sqlx::query_as::<_, Organization>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(organization)
    }

    async fn create_organization(&self, new: NewOrganization) -> Result<Organization, StoreError> {
        let query = format!(
            "INSERT INTO organizations (id, name, slug, subscription_plan, max_users, max_apis, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, true)
             RETURNING {}",
            ORGANIZATION_COLUMNS
        );
        let slug = new.slug.clone();
        sqlx::query_as::<_, Organization>(&query)
            .bind(Uuid::new_v4())
            .bind(new.name)
            .bind(new.slug)
            .bind(new.subscription_plan)
            .bind(new.max_users)
            .bind(new.max_apis)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, &format!("organization slug '{}' already exists", slug)))
    }

    async fn update_organization(
        &self,
        id: Uuid,
        patch: &OrganizationPatch,
    ) -> Result<Option<Organization>, StoreError> {
        let query = format!(
            "UPDATE organizations SET
                name = COALESCE($2, name),
                subscription_plan = COALESCE($3, subscription_plan),
                max_users = COALESCE($4, max_users),
                max_apis = COALESCE($5, max_apis),
                is_active = COALESCE($6, is_active),
                updated_at = now()
             WHERE id = $1
             RETURNING {}",
            ORGANIZATION_COLUMNS
        );
        let organization = sqlx::query_as::<_, Organization>(&query)
            .bind(id)
            .bind(patch.name.clone())
            .bind(patch.subscription_plan.clone())
            .bind(patch.max_users)
            .bind(patch.max_apis)
            .bind(patch.is_active)
            .fetch_optional(&self.pool)
            .await?;
        Ok(organization)
    }

    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, email, full_name, is_active, created_at, updated_at FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Profile::from))
    }

    async fn set_profiles_state(&self, ids: &[Uuid], state: Lifecycle) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE profiles SET is_active = $2, updated_at = now() WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .bind(state.is_active())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl AuditLog for PgStore {
    async fn record(&self, event: AuditEvent) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs
                (id, actor_id, organization_id, action, resource_type, resource_id,
                 old_values, new_values, ip_address, user_agent, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(event.id)
        .bind(event.actor_id)
        .bind(event.organization_id)
        .bind(event.action)
        .bind(event.resource_type)
        .bind(event.resource_id)
        .bind(event.old_values)
        .bind(event.new_values)
        .bind(event.ip_address)
        .bind(event.user_agent)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<AuditEvent>, StoreError> {
        let events = sqlx::query_as::<_, AuditEvent>(
            r#"
            SELECT id, actor_id, organization_id, action, resource_type, resource_id,
                   old_values, new_values, ip_address, user_agent, created_at
            FROM audit_logs
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }
}
