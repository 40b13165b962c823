// permissions/mod.rs - Role/permission resolution and enforcement
//
// catalog     static Permission/Role identifiers and the role hierarchy
// resolver    pure evaluation over a caller's role assignments
// gate        server-side enforcement (loads assignments, raises PermissionError)
// snapshot    the resolved state shipped to clients

pub mod catalog;
pub mod error;
pub mod gate;
pub mod requirement;
pub mod resolver;
pub mod snapshot;

pub use catalog::{Permission, Role, CATALOG_VERSION};
pub use error::{AuthzError, PermissionError};
pub use gate::{AuthorizationContext, AuthorizationGate};
pub use requirement::Requirement;
pub use resolver::PermissionResolver;
pub use snapshot::{PermissionSnapshot, RoleSummary};
