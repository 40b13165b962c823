use clap::Subcommand;
use serde_json::json;

use crate::cli::config::{effective_config, load_cli_config, ping_api, save_cli_config};
use crate::cli::utils::{mask_token, output_fields, output_success};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ConfigCommands {
    #[command(about = "Show the effective API URL and token")]
    Show,

    #[command(about = "Set the panel API base URL")]
    SetUrl {
        #[arg(help = "Base URL, e.g. https://panel.example.com")]
        url: String,
    },

    #[command(about = "Store a bearer token for subsequent commands")]
    SetToken {
        #[arg(help = "JWT issued by the panel")]
        token: String,
    },

    #[command(about = "Forget the stored token")]
    ClearToken,
}

pub async fn handle(cmd: ConfigCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let config = effective_config()?;
            let reachable = ping_api(&config.api_url).await;

            match output_format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "api_url": config.api_url,
                            "token_set": config.token.is_some(),
                            "reachable": reachable,
                        }))?
                    );
                }
                OutputFormat::Text => {
                    output_fields(&[
                        ("API URL", config.api_url.clone()),
                        ("Token", config.token.as_deref().map(mask_token).unwrap_or_else(|| "(none)".into())),
                        ("Status", if reachable { "up" } else { "down" }.to_string()),
                    ]);
                }
            }
            Ok(())
        }
        ConfigCommands::SetUrl { url } => {
            let parsed = url::Url::parse(&url).map_err(|e| anyhow::anyhow!("Invalid URL '{}': {}", url, e))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(anyhow::anyhow!("URL must use http or https"));
            }

            let mut config = load_cli_config()?;
            config.api_url = url.trim_end_matches('/').to_string();
            config.touch();
            save_cli_config(&config)?;

            output_success(
                &output_format,
                &format!("API URL set to {}", config.api_url),
                Some(json!({ "api_url": config.api_url })),
            )
        }
        ConfigCommands::SetToken { token } => {
            let mut config = load_cli_config()?;
            config.token = Some(token);
            config.touch();
            save_cli_config(&config)?;
            output_success(&output_format, "Token saved", None)
        }
        ConfigCommands::ClearToken => {
            let mut config = load_cli_config()?;
            config.token = None;
            config.touch();
            save_cli_config(&config)?;
            output_success(&output_format, "Token cleared", None)
        }
    }
}
