// handlers/elevated/mod.rs - Administrative handlers
//
// Route Prefix: /api/admin/*
// Same JWT middleware as the protected tier; each handler gates on a
// system-level permission (manage_system_users, view_audit_logs) or, for bulk
// role changes, manage_org_users in the target organization.

pub mod admin;
