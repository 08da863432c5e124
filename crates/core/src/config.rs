// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration loaded from a TOML file
//!
//! A missing file is created with defaults on first startup so operators get
//! a template to edit instead of a cryptic error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Top-level configuration for one managed server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Name of the proxied server backed by the managed machine
    #[serde(default = "default_server")]
    pub server: String,

    /// How long the server must sit at zero players before suspending
    #[serde(with = "humantime_serde", default = "default_sleep_delay")]
    pub sleep_delay: Duration,

    /// How often to re-query machine status outside of transitions
    #[serde(with = "humantime_serde", default = "default_status_check_interval")]
    pub status_check_interval: Duration,

    /// Compute instance hosting the server
    #[serde(default)]
    pub gce: GceConfig,

    /// Optional webhook for event notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookConfig>,
}

/// Location of the managed compute instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GceConfig {
    pub project: String,
    pub zone: String,
    pub instance: String,
}

/// Webhook notification settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    /// Name of the single text field in the JSON payload
    #[serde(default = "default_json_key")]
    pub json_key: String,
    /// Whether message texts may mention player names
    #[serde(default = "default_include_user")]
    pub include_user: bool,
}

fn default_server() -> String {
    "lobby".to_string()
}

fn default_sleep_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_status_check_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_json_key() -> String {
    "content".to_string()
}

fn default_include_user() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: default_server(),
            sleep_delay: default_sleep_delay(),
            status_check_interval: default_status_check_interval(),
            gce: GceConfig::default(),
            webhook: None,
        }
    }
}

impl Default for GceConfig {
    fn default() -> Self {
        Self {
            project: "my-project".to_string(),
            zone: "europe-west2-c".to_string(),
            instance: "minecraft-vm".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("unable to write config {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("invalid config {0}: {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("unable to encode default config: {0}")]
    Encode(#[from] toml::ser::Error),
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    /// Load configuration, writing a default file first if none exists
    pub fn load_or_init(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Config::default();
            let content = toml::to_string_pretty(&config)?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::Write(path.to_path_buf(), e))?;
            }
            std::fs::write(path, content)
                .map_err(|e| ConfigError::Write(path.to_path_buf(), e))?;
            return Ok(config);
        }
        Self::load(path)
    }
}
