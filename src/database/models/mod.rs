pub mod audit;
pub mod organization;
pub mod profile;
pub mod role_assignment;

pub use audit::AuditEvent;
pub use organization::{NewOrganization, Organization, OrganizationPatch, SUBSCRIPTION_PLANS};
pub use profile::{Profile, ProfileRow};
pub use role_assignment::{NewGrant, RoleAssignment, RoleAssignmentRow};
