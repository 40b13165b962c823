use axum::extract::{rejection::JsonRejection, Extension, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::database::models::AuditEvent;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, RequestProvenance};
use crate::permissions::{AuthorizationGate, Permission};
use crate::services::{BulkOutcome, BulkRequest, BulkService};
use crate::state::AppState;

/// POST /api/admin/users/bulk - Multi-target user administration
///
/// Expected Input:
/// ```json
/// { "userIds": ["..."], "action": "assign_role", "organizationId": "...", "role": "USER" }
/// ```
///
/// Expected Output:
/// ```json
/// { "success": true, "data": { "processed": 2, "failed": 0, "details": { ... } } }
/// ```
pub async fn bulk(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    provenance: RequestProvenance,
    payload: Result<Json<BulkRequest>, JsonRejection>,
) -> ApiResult<BulkOutcome> {
    let Json(request) = payload.map_err(|e| ApiError::invalid_json(e.body_text()))?;

    let outcome = BulkService::new(state.store(), state.config.api.bulk_max_targets)
        .execute(auth_user.user_id, request, &provenance)
        .await?;
    Ok(ApiResponse::success(outcome))
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
}

/// GET /api/admin/audit?limit=N - Most recent audit events, newest first
pub async fn audit(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Vec<AuditEvent>> {
    AuthorizationGate::new(state.store())
        .require_permission(auth_user.user_id, Permission::ViewAuditLogs, None)
        .await?;

    let max = state.config.api.audit_page_limit;
    let limit = query.limit.unwrap_or(50).clamp(1, max.max(1));
    let events = state.store().recent(limit).await?;
    Ok(ApiResponse::success(events))
}
