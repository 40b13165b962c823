use axum::extract::{rejection::JsonRejection, Extension, State};
use axum::Json;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, RequestProvenance};
use crate::services::{AssignRoleRequest, RevokeRoleRequest, RoleService};
use crate::state::AppState;

/// POST /api/roles/assign
///
/// Expected Input:
/// ```json
/// { "userId": "...", "organizationId": "...", "role": "ORG_ADMIN", "permissions": [], "expiresAt": null }
/// ```
pub async fn assign(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    provenance: RequestProvenance,
    payload: Result<Json<AssignRoleRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload.map_err(|e| ApiError::invalid_json(e.body_text()))?;
    let user_id = request.user_id;
    let grant = RoleService::new(state.store())
        .assign(auth_user.user_id, request, &provenance)
        .await?;

    Ok(ApiResponse::created(json!({
        "userId": user_id,
        "role": grant.role,
        "organizationId": grant.organization_id,
        "permissions": grant.permissions,
        "expiresAt": grant.expires_at,
    })))
}

/// POST /api/roles/revoke
pub async fn revoke(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    provenance: RequestProvenance,
    payload: Result<Json<RevokeRoleRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload.map_err(|e| ApiError::invalid_json(e.body_text()))?;
    let removed = RoleService::new(state.store())
        .revoke(auth_user.user_id, request, &provenance)
        .await?;

    Ok(ApiResponse::success(json!({ "removed": removed })))
}
