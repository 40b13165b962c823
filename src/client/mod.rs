// client/mod.rs - Consumer side of the permission snapshot
//
// The guard never sees the role hierarchy. It asks the server for a resolved
// snapshot and answers every question from that value, failing closed.

pub mod guard;
pub mod http;

pub use guard::{FetchTicket, GuardOutcome, GuardRequirement, GuardState, PermissionGuard, SessionEvent};
pub use http::PanelClient;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::permissions::PermissionSnapshot;

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Server responded {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

/// Anything that can produce the caller's current permission snapshot
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<PermissionSnapshot, GuardError>;
}

#[async_trait]
impl<T: SnapshotSource + ?Sized> SnapshotSource for Arc<T> {
    async fn fetch_snapshot(&self) -> Result<PermissionSnapshot, GuardError> {
        self.as_ref().fetch_snapshot().await
    }
}
