use clap::Subcommand;

use crate::cli::config::effective_config;
use crate::cli::utils::{output_fields, output_json};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Show the user the configured token belongs to")]
    Whoami,
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Whoami => {
            let config = effective_config()?;
            let whoami = config.client().whoami().await?;

            match output_format {
                OutputFormat::Json => output_json(&whoami)?,
                OutputFormat::Text => {
                    let field = |key: &str| {
                        whoami
                            .get(key)
                            .and_then(|v| v.as_str())
                            .unwrap_or("-")
                            .to_string()
                    };
                    output_fields(&[("User", field("userId")), ("Email", field("email"))]);
                }
            }
            Ok(())
        }
    }
}
