use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub source: SourceConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    /// The getReviews endpoint for the account's profile.
    pub base_url: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Fixed pause between page requests. Too-frequent requests risk a
    /// temporary IP ban upstream, so this is applied unconditionally.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    /// Hard cap on pages fetched per scan. 0 = unlimited.
    #[serde(default)]
    pub max_pages: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_page_size() -> u32 {
    100
}
fn default_request_delay_ms() -> u64 {
    1100
}
fn default_timeout_secs() -> u64 {
    30
}

impl SourceConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.source.page_size == 0 {
        anyhow::bail!("source.page_size must be > 0");
    }

    reqwest::Url::parse(&config.source.base_url)
        .with_context(|| format!("source.base_url is not a valid URL: {}", config.source.base_url))?;

    if config.source.timeout_secs == 0 {
        anyhow::bail!("source.timeout_secs must be > 0");
    }

    Ok(config)
}
