use thiserror::Error;
use uuid::Uuid;

use super::requirement::Requirement;
use crate::database::StoreError;

/// Authenticated caller lacks a required permission or role.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{requirement} required{}", scope_suffix(.organization_id))]
pub struct PermissionError {
    pub caller_id: Uuid,
    pub requirement: Requirement,
    pub organization_id: Option<Uuid>,
}

fn scope_suffix(organization_id: &Option<Uuid>) -> String {
    match organization_id {
        Some(id) => format!(" in organization {}", id),
        None => String::new(),
    }
}

impl PermissionError {
    pub const KIND: &'static str = "PermissionError";

    pub fn kind(&self) -> &'static str {
        Self::KIND
    }
}

/// Gate failures. A store failure is never reported as a denial.
#[derive(Debug, Error)]
pub enum AuthzError {
    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error("Failed to load role assignments: {0}")]
    Store(#[from] StoreError),
}

impl AuthzError {
    pub fn is_denial(&self) -> bool {
        matches!(self, AuthzError::Permission(_))
    }
}
