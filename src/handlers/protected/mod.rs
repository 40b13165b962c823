// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Route Prefix: /api/auth/*, /api/organizations/*, /api/roles/*
// Every handler receives the caller as `Extension<AuthUser>`; operations that
// touch an organization run the authorization gate scoped to it.

pub mod auth;
pub mod organizations;
pub mod roles;
