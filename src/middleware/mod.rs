pub mod auth;
pub mod provenance;
pub mod response;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use provenance::RequestProvenance;
pub use response::{ApiResponse, ApiResult};
