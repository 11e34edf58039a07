use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
}

/// Where and how schedules are fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Root of the v2 API. Endpoint paths are joined onto it, so keep the
    /// trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per-request timeout. Unset means whatever the HTTP client defaults to.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

/// Rolling window kept around "now", in hours.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_look_behind_hours")]
    pub look_behind_hours: u32,
    #[serde(default = "default_look_ahead_hours")]
    pub look_ahead_hours: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_auto_refresh")]
    pub auto_refresh: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: None,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            look_behind_hours: default_look_behind_hours(),
            look_ahead_hours: default_look_ahead_hours(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            auto_refresh: default_auto_refresh(),
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        // A zero interval would spin the timer
        Duration::from_secs(self.interval_secs.max(1))
    }
}

fn default_base_url() -> String {
    "http://api.sr.se/api/v2/".to_string()
}

fn default_user_agent() -> String {
    format!("srinfo/{}", env!("CARGO_PKG_VERSION"))
}

fn default_look_behind_hours() -> u32 {
    6
}

fn default_look_ahead_hours() -> u32 {
    12
}

fn default_interval_secs() -> u64 {
    3600
}

fn default_auto_refresh() -> bool {
    true
}

impl Config {
    /// Load the user config, writing a default one on first run.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
