//! Configuration management with YAML support

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub mailbox: MailboxConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

/// Sheet store configuration (local SQLite backend)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

/// Mailbox configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailboxConfig {
    #[serde(default = "default_mailbox_path")]
    pub path: String,

    /// When true, messages that fail parsing are moved to a quarantine
    /// bucket and never retried; when false they stay eligible on every run.
    #[serde(default)]
    pub quarantine_failures: bool,
}

/// Language model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model_name")]
    pub name: String,
}

/// Snapshot cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a captured snapshot stays valid before a re-fetch
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: i64,
}

// Default value functions
fn default_store_path() -> String {
    "~/.local/share/apptrack/apptrack.db".to_string()
}

fn default_mailbox_path() -> String {
    "~/.local/share/apptrack/mailbox".to_string()
}

fn default_model_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model_name() -> String {
    "llama3.1".to_string()
}

fn default_ttl_minutes() -> i64 {
    15
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            path: default_mailbox_path(),
            quarantine_failures: false,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: default_model_endpoint(),
            name: default_model_name(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_ttl_minutes(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            mailbox: MailboxConfig::default(),
            model: ModelConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    /// Searches in order:
    /// 1. Provided path
    /// 2. ./apptrack.yaml (current directory)
    /// 3. ~/.config/apptrack/apptrack.yaml
    pub fn load(path: &str) -> Result<Self> {
        let search_paths = vec![
            shellexpand::tilde(path).to_string(),
            "apptrack.yaml".to_string(),
            shellexpand::tilde("~/.config/apptrack/apptrack.yaml").to_string(),
        ];

        for search_path in &search_paths {
            if std::path::Path::new(search_path).exists() {
                let content = std::fs::read_to_string(search_path)?;
                let config: Config = serde_yaml::from_str(&content)?;
                return Ok(config);
            }
        }

        // No config file found, use defaults
        Ok(Config::default())
    }

    /// Get the store path, expanding ~ to home directory
    pub fn store_path(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.store.path).to_string();
        PathBuf::from(expanded)
    }

    /// Get the mailbox path, expanding ~ to home directory
    pub fn mailbox_path(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.mailbox.path).to_string();
        PathBuf::from(expanded)
    }

    /// Snapshot validity window
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.cache.ttl_minutes)
    }
}
