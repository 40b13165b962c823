pub mod bulk_service;
pub mod organization_service;
pub mod role_service;
pub mod snapshot_service;

pub use bulk_service::{BulkAction, BulkError, BulkOutcome, BulkRequest, BulkService};
pub use organization_service::OrganizationService;
pub use role_service::{AssignRoleRequest, RevokeRoleRequest, RoleService};
pub use snapshot_service::permission_snapshot;

use thiserror::Error;

use crate::database::StoreError;
use crate::error::{ApiError, ValidationError};
use crate::permissions::{AuthzError, PermissionError};

/// Failures from single-target gated operations
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),
}

impl From<PermissionError> for ServiceError {
    fn from(err: PermissionError) -> Self {
        ServiceError::Authz(err.into())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(e) => e.into(),
            ServiceError::Authz(e) => e.into(),
            ServiceError::Store(e) => e.into(),
            ServiceError::NotFound(msg) => ApiError::not_found(msg),
            ServiceError::Conflict(msg) => ApiError::conflict(msg),
        }
    }
}
