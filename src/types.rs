/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

/// Soft-delete lifecycle for profiles and role assignments.
/// Rows are never physically removed in the common path; they move Active -> Inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Active,
    Inactive,
}

impl Lifecycle {
    pub fn from_flag(is_active: bool) -> Self {
        if is_active {
            Lifecycle::Active
        } else {
            Lifecycle::Inactive
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Lifecycle::Active)
    }
}

impl From<bool> for Lifecycle {
    fn from(is_active: bool) -> Self {
        Lifecycle::from_flag(is_active)
    }
}
