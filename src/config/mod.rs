use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API key for the completion and title endpoints.
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible endpoint.
    pub base_url: String,
    /// Selected model label, e.g. "OpenAI: GPT-4o-mini".
    pub default_model: String,
    /// Directory holding the persisted stores.
    pub data_dir: PathBuf,
    /// Minimum interval between UI delta notifications, in milliseconds.
    pub throttle_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .map(|d| d.join("skein"))
            .unwrap_or_else(|| PathBuf::from(".skein"));

        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            default_model: "OpenAI: GPT-4o-mini".to_string(),
            data_dir,
            throttle_ms: 100,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = dirs::config_dir()
            .map(|d| d.join("skein").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".skein/config.toml"));

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}
