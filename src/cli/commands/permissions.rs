use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::cli::config::effective_config;
use crate::cli::utils::{output_error, output_fields, output_json, output_success};
use crate::cli::OutputFormat;
use crate::client::{GuardRequirement, GuardState, PermissionGuard, SnapshotSource};
use crate::permissions::{Permission, Requirement, Role};

#[derive(Subcommand)]
pub enum PermissionCommands {
    #[command(about = "Show the caller's resolved permission snapshot")]
    Show,

    #[command(about = "Check a requirement; exits non-zero when denied")]
    Check {
        #[arg(long, help = "Required permission (repeat to require all)")]
        permission: Vec<Permission>,

        #[arg(long, help = "Acceptable role (repeat to accept any)")]
        role: Vec<Role>,

        #[arg(long, help = "Require SYSTEM_ADMIN")]
        system_admin: bool,

        #[arg(long, help = "Organization the check is scoped to")]
        org: Option<Uuid>,
    },
}

/// Exactly one of the three flag groups must be given.
pub fn build_requirement(
    permissions: Vec<Permission>,
    roles: Vec<Role>,
    system_admin: bool,
) -> anyhow::Result<Requirement> {
    match (permissions.len(), roles.len(), system_admin) {
        (0, 0, true) => Ok(Requirement::SystemAdmin),
        (1, 0, false) => Ok(Requirement::Permission(permissions[0])),
        (_, 0, false) if !permissions.is_empty() => Ok(Requirement::AllPermissions(permissions)),
        (0, 1, false) => Ok(Requirement::Role(roles[0])),
        (0, _, false) if !roles.is_empty() => Ok(Requirement::AnyRole(roles)),
        (0, 0, false) => Err(anyhow::anyhow!("Specify --permission, --role or --system-admin")),
        _ => Err(anyhow::anyhow!("--permission, --role and --system-admin are mutually exclusive")),
    }
}

pub async fn handle(cmd: PermissionCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = effective_config()?;
    let client = config.client();

    match cmd {
        PermissionCommands::Show => {
            let snapshot = client.fetch_snapshot().await?;

            match output_format {
                OutputFormat::Json => output_json(&snapshot)?,
                OutputFormat::Text => {
                    let roles = snapshot
                        .roles
                        .iter()
                        .map(|r| match r.organization_id {
                            Some(org) => format!("{} @ {}", r.role_type, org),
                            None => format!("{} (global)", r.role_type),
                        })
                        .collect::<Vec<_>>();
                    let permissions = snapshot.permissions.iter().map(|p| p.to_string()).collect::<Vec<_>>();

                    output_fields(&[
                        ("System admin", snapshot.is_system_admin.to_string()),
                        ("Roles", if roles.is_empty() { "(none)".into() } else { roles.join(", ") }),
                        (
                            "Permissions",
                            if permissions.is_empty() { "(none)".into() } else { permissions.join(", ") },
                        ),
                        ("Organizations", snapshot.organizations.len().to_string()),
                    ]);
                }
            }
            Ok(())
        }
        PermissionCommands::Check {
            permission,
            role,
            system_admin,
            org,
        } => {
            let requirement = build_requirement(permission, role, system_admin)?;
            let label = requirement.to_string();

            let mut guard = PermissionGuard::new(
                client,
                GuardRequirement {
                    requirement,
                    organization_id: org,
                },
            );

            match guard.mount().await {
                GuardState::Granted => output_success(
                    &output_format,
                    &format!("Granted: {}", label),
                    Some(json!({ "granted": true, "requirement": label })),
                ),
                _ => {
                    output_error(&output_format, &format!("Denied: {}", label), Some("PERMISSION_DENIED"))?;
                    Err(anyhow::anyhow!("permission check failed"))
                }
            }
        }
    }
}
