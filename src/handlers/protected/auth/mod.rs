use axum::extract::{Extension, State};
use serde::Serialize;
use uuid::Uuid;

use crate::database::models::Profile;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::permissions::PermissionSnapshot;
use crate::services::permission_snapshot;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Whoami {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub profile: Option<Profile>,
}

/// GET /api/auth/whoami - The authenticated caller and their profile, if any
pub async fn whoami(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Whoami> {
    let profile = state.store().find_profile(auth_user.user_id).await?;

    Ok(ApiResponse::success(Whoami {
        user_id: auth_user.user_id,
        email: auth_user.email,
        profile,
    }))
}

/// GET /api/auth/permissions - Resolved permission snapshot for the caller
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "permissions": ["access_apis", "manage_org_users", ...],
///     "roles": [{ "role_type": "ORG_ADMIN", "organization_id": "..." }],
///     "organizations": [...],
///     "isSystemAdmin": false,
///     "globalPermissions": [],
///     "organizationPermissions": { "<org id>": [...] },
///     "catalogVersion": 1
///   }
/// }
/// ```
pub async fn permissions(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<PermissionSnapshot> {
    let snapshot = permission_snapshot(state.store(), auth_user.user_id).await?;
    Ok(ApiResponse::success(snapshot))
}
