use axum::extract::{rejection::JsonRejection, Extension, Path, State};
use axum::Json;
use uuid::Uuid;

use crate::database::models::{NewOrganization, Organization, OrganizationPatch, RoleAssignment};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, RequestProvenance};
use crate::services::OrganizationService;
use crate::state::AppState;

/// GET /api/organizations
pub async fn list(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Vec<Organization>> {
    let organizations = OrganizationService::new(state.store()).list(auth_user.user_id).await?;
    Ok(ApiResponse::success(organizations))
}

/// POST /api/organizations - requires manage_organizations
pub async fn create(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    provenance: RequestProvenance,
    payload: Result<Json<NewOrganization>, JsonRejection>,
) -> ApiResult<Organization> {
    let Json(new) = payload.map_err(|e| ApiError::invalid_json(e.body_text()))?;
    let organization = OrganizationService::new(state.store())
        .create(auth_user.user_id, new, &provenance)
        .await?;
    Ok(ApiResponse::created(organization))
}

/// GET /api/organizations/:id - requires access_apis in the organization
pub async fn show(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Organization> {
    let organization = OrganizationService::new(state.store()).get(auth_user.user_id, id).await?;
    Ok(ApiResponse::success(organization))
}

/// PATCH /api/organizations/:id - requires manage_org_settings in the organization
pub async fn update(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    provenance: RequestProvenance,
    payload: Result<Json<OrganizationPatch>, JsonRejection>,
) -> ApiResult<Organization> {
    let Json(patch) = payload.map_err(|e| ApiError::invalid_json(e.body_text()))?;
    let organization = OrganizationService::new(state.store())
        .update(auth_user.user_id, id, patch, &provenance)
        .await?;
    Ok(ApiResponse::success(organization))
}

/// GET /api/organizations/:id/roles - requires manage_org_users in the organization
pub async fn roles(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<RoleAssignment>> {
    let assignments = OrganizationService::new(state.store()).roles(auth_user.user_id, id).await?;
    Ok(ApiResponse::success(assignments))
}
