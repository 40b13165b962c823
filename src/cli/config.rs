use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::PanelClient;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Persisted in `<config dir>/cli.json`. `PANEL_API_URL` and `PANEL_TOKEN`
/// override the file for a single invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub api_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            updated_at: None,
        }
    }
}

impl CliConfig {
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("PANEL_API_URL") {
            self.api_url = url;
        }
        if let Ok(token) = std::env::var("PANEL_TOKEN") {
            if !token.is_empty() {
                self.token = Some(token);
            }
        }
        self
    }

    pub fn client(&self) -> PanelClient {
        PanelClient::new(self.api_url.clone(), self.token.clone())
    }

    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("PANEL_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("api-panel").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn load_cli_config() -> anyhow::Result<CliConfig> {
    let config_file = get_config_dir()?.join("cli.json");

    if !config_file.exists() {
        return Ok(CliConfig::default());
    }

    let content = fs::read_to_string(config_file)?;
    let config: CliConfig = serde_json::from_str(&content)?;
    Ok(config)
}

pub fn save_cli_config(config: &CliConfig) -> anyhow::Result<()> {
    let config_file = get_config_dir()?.join("cli.json");

    let content = serde_json::to_string_pretty(config)?;
    fs::write(config_file, content)?;
    Ok(())
}

/// Stored config with environment overrides applied
pub fn effective_config() -> anyhow::Result<CliConfig> {
    Ok(load_cli_config()?.with_env_overrides())
}

pub async fn ping_api(api_url: &str) -> bool {
    let client = reqwest::Client::new();
    let url = format!("{}/health", api_url.trim_end_matches('/'));

    match client.get(&url).timeout(std::time::Duration::from_secs(5)).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}
