//! Hivesched configuration system.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HiveConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub dronebot: DronebotConfig,
    #[serde(default)]
    pub reasoning: ReasoningConfig,
    /// Assignee persona → delivery-agent id. Tasks addressed to an
    /// assignee not listed here fail with a terminal validation error.
    #[serde(default = "default_agents")]
    pub agents: HashMap<String, String>,
}

fn default_agents() -> HashMap<String, String> {
    HashMap::from([
        ("void-mother".into(), "void-mother-chat".into()),
        ("0xf100".into(), "greeter-drone".into()),
        ("0xf101".into(), "propaganda-drone".into()),
    ])
}

impl Default for HiveConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            dronebot: DronebotConfig::default(),
            reasoning: ReasoningConfig::default(),
            agents: default_agents(),
        }
    }
}

impl HiveConfig {
    /// Load config from the default path (~/.hivesched/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::HiveError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| crate::error::HiveError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::HiveError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Hivesched home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".hivesched")
    }
}

/// Scheduler driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between due-task scans when running the interval loop.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    /// Directory holding the file-backed task and drone stores.
    #[serde(default = "default_store_dir")]
    pub store_dir: String,
}

fn default_check_interval() -> u64 {
    900
}
fn default_store_dir() -> String {
    "~/.hivesched/store".into()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval(),
            store_dir: default_store_dir(),
        }
    }
}

/// Dronebot (notification channel) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DronebotConfig {
    #[serde(default = "default_dronebot_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_token: String,
    /// Timeout for simple sends and role lookups.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,
    /// Timeout for poll creation.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
    /// Named channel that receives operational error alerts.
    #[serde(default = "default_alert_channel")]
    pub alert_channel: String,
}

fn default_dronebot_url() -> String {
    "http://localhost:3000".into()
}
fn default_send_timeout() -> u64 {
    10
}
fn default_poll_timeout() -> u64 {
    30
}
fn default_alert_channel() -> String {
    "cpu-errors".into()
}

impl Default for DronebotConfig {
    fn default() -> Self {
        Self {
            base_url: default_dronebot_url(),
            api_token: String::new(),
            send_timeout_secs: default_send_timeout(),
            poll_timeout_secs: default_poll_timeout(),
            alert_channel: default_alert_channel(),
        }
    }
}

/// Reasoning backend (LLM) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    #[serde(default = "default_reasoning_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Timeout per reasoning round trip.
    #[serde(default = "default_reasoning_timeout")]
    pub timeout_secs: u64,
}

fn default_reasoning_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_reasoning_timeout() -> u64 {
    30
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            base_url: default_reasoning_url(),
            api_key: String::new(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_reasoning_timeout(),
        }
    }
}
