pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "panel")]
#[command(about = "Panel CLI - Inspect permissions and run admin operations against the panel API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Show or change the API URL and token used by this CLI")]
    Config {
        #[command(subcommand)]
        cmd: commands::config::ConfigCommands,
    },

    #[command(about = "Current caller information")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Resolved permissions and requirement checks")]
    Permissions {
        #[command(subcommand)]
        cmd: commands::permissions::PermissionCommands,
    },

    #[command(about = "Bulk user administration")]
    Bulk {
        #[command(subcommand)]
        cmd: commands::bulk::BulkCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Config { cmd } => commands::config::handle(cmd, output_format).await,
        Commands::Auth { cmd } => commands::auth::handle(cmd, output_format).await,
        Commands::Permissions { cmd } => commands::permissions::handle(cmd, output_format).await,
        Commands::Bulk { cmd } => commands::bulk::handle(cmd, output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::bulk::BulkCommands;
    use crate::cli::commands::permissions::PermissionCommands;
    use crate::permissions::{Permission, Role};

    #[test]
    fn parses_permission_check() {
        let cli = Cli::try_parse_from([
            "panel",
            "--json",
            "permissions",
            "check",
            "--permission",
            "manage_org_users",
            "--org",
            "00000000-0000-0000-0000-000000000001",
        ])
        .unwrap();

        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        match cli.command {
            Commands::Permissions {
                cmd: PermissionCommands::Check { permission, org, .. },
            } => {
                assert_eq!(permission, vec![Permission::ManageOrgUsers]);
                assert!(org.is_some());
            }
            _ => panic!("expected permissions check"),
        }
    }

    #[test]
    fn parses_bulk_assign_role() {
        let cli = Cli::try_parse_from([
            "panel",
            "bulk",
            "assign-role",
            "00000000-0000-0000-0000-00000000000a",
            "00000000-0000-0000-0000-00000000000b",
            "--role",
            "ORG_ADMIN",
            "--org",
            "00000000-0000-0000-0000-000000000001",
        ])
        .unwrap();

        match cli.command {
            Commands::Bulk {
                cmd: BulkCommands::AssignRole { user_ids, role, .. },
            } => {
                assert_eq!(user_ids.len(), 2);
                assert_eq!(role, Role::OrgAdmin);
            }
            _ => panic!("expected bulk assign-role"),
        }
    }

    #[test]
    fn rejects_unknown_permission() {
        assert!(Cli::try_parse_from(["panel", "permissions", "check", "--permission", "fly"]).is_err());
    }
}
