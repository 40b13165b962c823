pub mod auth;
pub mod bulk;
pub mod config;
pub mod permissions;
