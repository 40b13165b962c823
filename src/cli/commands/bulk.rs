use chrono::{DateTime, Utc};
use clap::Subcommand;
use uuid::Uuid;

use crate::cli::config::effective_config;
use crate::cli::utils::{output_json, output_success};
use crate::cli::OutputFormat;
use crate::permissions::{Permission, Role};
use crate::services::{BulkAction, BulkRequest};

#[derive(Subcommand)]
pub enum BulkCommands {
    #[command(about = "Reactivate user profiles")]
    Activate {
        #[arg(required = true, help = "Target user ids")]
        user_ids: Vec<Uuid>,
    },

    #[command(about = "Deactivate user profiles")]
    Deactivate {
        #[arg(required = true, help = "Target user ids")]
        user_ids: Vec<Uuid>,
    },

    #[command(about = "Grant a role to every target")]
    AssignRole {
        #[arg(required = true, help = "Target user ids")]
        user_ids: Vec<Uuid>,
        #[arg(long, help = "Role to grant")]
        role: Role,
        #[arg(long, help = "Organization scope (omit only for SYSTEM_ADMIN)")]
        org: Option<Uuid>,
        #[arg(long, help = "Extra permission on the assignment (repeatable)")]
        permission: Vec<Permission>,
        #[arg(long, help = "RFC 3339 expiry, e.g. 2030-01-01T00:00:00Z")]
        expires_at: Option<DateTime<Utc>>,
    },

    #[command(about = "Revoke role assignments in an organization")]
    RemoveRoles {
        #[arg(required = true, help = "Target user ids")]
        user_ids: Vec<Uuid>,
        #[arg(long, help = "Organization scope")]
        org: Uuid,
        #[arg(long, help = "Only revoke this role")]
        role: Option<Role>,
    },

    #[command(about = "Deactivate profiles and revoke all their assignments")]
    Delete {
        #[arg(required = true, help = "Target user ids")]
        user_ids: Vec<Uuid>,
    },
}

impl From<BulkCommands> for BulkRequest {
    fn from(cmd: BulkCommands) -> Self {
        let (user_ids, action) = match cmd {
            BulkCommands::Activate { user_ids } => (user_ids, BulkAction::Activate),
            BulkCommands::Deactivate { user_ids } => (user_ids, BulkAction::Deactivate),
            BulkCommands::AssignRole {
                user_ids,
                role,
                org,
                permission,
                expires_at,
            } => (
                user_ids,
                BulkAction::AssignRole {
                    organization_id: org,
                    role: Some(role),
                    permissions: permission,
                    expires_at,
                },
            ),
            BulkCommands::RemoveRoles { user_ids, org, role } => (
                user_ids,
                BulkAction::RemoveRoles {
                    organization_id: Some(org),
                    role,
                },
            ),
            BulkCommands::Delete { user_ids } => (user_ids, BulkAction::Delete),
        };
        BulkRequest { user_ids, action }
    }
}

pub async fn handle(cmd: BulkCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = effective_config()?;
    let request = BulkRequest::from(cmd);
    let action = request.action.name();

    let outcome = config.client().bulk(&request).await?;

    match output_format {
        OutputFormat::Json => output_json(&outcome),
        OutputFormat::Text => output_success(
            &output_format,
            &format!("{}: {} processed, {} failed", action, outcome.processed, outcome.failed),
            None,
        ),
    }
}
