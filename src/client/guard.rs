use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{GuardError, SnapshotSource};
use crate::permissions::{Permission, PermissionSnapshot, Requirement, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    Loading,
    Granted,
    Denied,
}

/// What the caller should do with the guarded content right now
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Pending,
    Render,
    Fallback,
    Redirect(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    TokenRefreshed,
    SignedOut,
}

/// A requirement plus the organization it is scoped to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardRequirement {
    pub requirement: Requirement,
    #[serde(default)]
    pub organization_id: Option<Uuid>,
}

impl GuardRequirement {
    pub fn permission(permission: Permission) -> Self {
        Requirement::Permission(permission).into()
    }

    pub fn all_permissions(permissions: impl IntoIterator<Item = Permission>) -> Self {
        Requirement::AllPermissions(permissions.into_iter().collect()).into()
    }

    pub fn role(role: Role) -> Self {
        Requirement::Role(role).into()
    }

    pub fn any_role(roles: impl IntoIterator<Item = Role>) -> Self {
        Requirement::AnyRole(roles.into_iter().collect()).into()
    }

    pub fn in_organization(mut self, organization_id: Uuid) -> Self {
        self.organization_id = Some(organization_id);
        self
    }
}

impl From<Requirement> for GuardRequirement {
    fn from(requirement: Requirement) -> Self {
        Self {
            requirement,
            organization_id: None,
        }
    }
}

/// Issued when a fetch starts; a result is only applied if no newer fetch or
/// sign-out happened in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
}

/// Client-side gate over a server-resolved [`PermissionSnapshot`].
///
/// `Loading` until the first fetch settles, then `Granted` or `Denied`.
/// Any fetch failure denies.
pub struct PermissionGuard<S> {
    source: S,
    requirement: GuardRequirement,
    redirect_to: Option<String>,
    snapshot: Option<PermissionSnapshot>,
    state: GuardState,
    generation: u64,
}

impl<S: SnapshotSource> PermissionGuard<S> {
    pub fn new(source: S, requirement: impl Into<GuardRequirement>) -> Self {
        Self {
            source,
            requirement: requirement.into(),
            redirect_to: None,
            snapshot: None,
            state: GuardState::Loading,
            generation: 0,
        }
    }

    /// Send denied callers to `target` instead of rendering a fallback
    pub fn redirect_to(mut self, target: impl Into<String>) -> Self {
        self.redirect_to = Some(target.into());
        self
    }

    pub async fn mount(&mut self) -> GuardState {
        self.refresh().await
    }

    pub async fn refresh(&mut self) -> GuardState {
        let ticket = self.begin_refresh();
        let result = self.source.fetch_snapshot().await;
        self.apply(ticket, result)
    }

    /// Start a fetch: resets to `Loading` and supersedes any fetch in flight.
    pub fn begin_refresh(&mut self) -> FetchTicket {
        self.generation += 1;
        self.state = GuardState::Loading;
        FetchTicket {
            generation: self.generation,
        }
    }

    pub fn apply(&mut self, ticket: FetchTicket, result: Result<PermissionSnapshot, GuardError>) -> GuardState {
        if ticket.generation != self.generation {
            debug!(
                "Ignoring snapshot from generation {} (current {})",
                ticket.generation, self.generation
            );
            return self.state;
        }

        match result {
            Ok(snapshot) => {
                self.snapshot = Some(snapshot);
                self.evaluate();
            }
            Err(e) => {
                warn!("Permission snapshot unavailable, denying: {}", e);
                self.snapshot = None;
                self.state = GuardState::Denied;
            }
        }
        self.state
    }

    /// Re-evaluates against the cached snapshot; never refetches.
    pub fn set_requirement(&mut self, requirement: impl Into<GuardRequirement>) -> GuardState {
        let requirement = requirement.into();
        if requirement == self.requirement {
            return self.state;
        }
        self.requirement = requirement;
        if self.snapshot.is_some() {
            self.evaluate();
        }
        self.state
    }

    pub async fn on_session_change(&mut self, event: SessionEvent) -> GuardState {
        match event {
            SessionEvent::SignedOut => {
                self.generation += 1;
                self.snapshot = None;
                self.state = GuardState::Denied;
                self.state
            }
            SessionEvent::SignedIn | SessionEvent::TokenRefreshed => self.refresh().await,
        }
    }

    fn evaluate(&mut self) {
        let granted = self
            .snapshot
            .as_ref()
            .is_some_and(|s| s.satisfies(&self.requirement.requirement, self.requirement.organization_id));

        self.state = if granted { GuardState::Granted } else { GuardState::Denied };
        debug!("Guard for {} evaluated to {:?}", self.requirement.requirement, self.state);
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn requirement(&self) -> &GuardRequirement {
        &self.requirement
    }

    pub fn snapshot(&self) -> Option<&PermissionSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn outcome(&self) -> GuardOutcome {
        match self.state {
            GuardState::Loading => GuardOutcome::Pending,
            GuardState::Granted => GuardOutcome::Render,
            GuardState::Denied => match &self.redirect_to {
                Some(target) => GuardOutcome::Redirect(target.clone()),
                None => GuardOutcome::Fallback,
            },
        }
    }

    /// `content` when granted, otherwise `fallback` (nothing while loading)
    pub fn gate<T>(&self, content: T, fallback: Option<T>) -> Option<T> {
        match self.state {
            GuardState::Granted => Some(content),
            GuardState::Denied => fallback,
            GuardState::Loading => None,
        }
    }

    pub fn has_permission(&self, permission: Permission, organization_id: Option<Uuid>) -> bool {
        self.snapshot
            .as_ref()
            .is_some_and(|s| s.has_permission(permission, organization_id))
    }

    pub fn has_role(&self, role: Role, organization_id: Option<Uuid>) -> bool {
        self.snapshot.as_ref().is_some_and(|s| s.has_role(role, organization_id))
    }

    pub fn is_system_admin(&self) -> bool {
        self.snapshot.as_ref().is_some_and(|s| s.is_system_admin)
    }
}
