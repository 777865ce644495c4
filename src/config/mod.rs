//! Configuration management for Relaycast
//!
//! Configuration is loaded from `~/.relaycast/config.json` with environment
//! variable overrides. There is no global instance: callers load a `Config`
//! and hand it to the channel factory.

mod types;
pub mod validate;

pub use types::*;

use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::warn;

impl Config {
    /// Returns the Relaycast configuration directory path (~/.relaycast)
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".relaycast")
    }

    /// Returns the path to the config file (~/.relaycast/config.json)
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load configuration from the default path with environment overrides.
    ///
    /// If the config file doesn't exist, returns default configuration.
    /// Environment variables can override config values using the pattern:
    /// `RELAYCAST_SECTION_SUBSECTION_KEY`
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::path())
    }

    /// Load configuration from a specific path with environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables follow the pattern: RELAYCAST_SECTION_SUBSECTION_KEY
    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (the environment in
    /// production, a map in tests).
    pub(crate) fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Web
        if let Some(val) = lookup("RELAYCAST_CHANNELS_WEB_ENABLED") {
            match val.parse() {
                Ok(enabled) => self.channels.web.enabled = enabled,
                Err(_) => warn!("Ignoring RELAYCAST_CHANNELS_WEB_ENABLED={}", val),
            }
        }

        // WhatsApp
        if let Some(val) = lookup("RELAYCAST_CHANNELS_WHATSAPP_WEBHOOK_URL") {
            self.channels.whatsapp.webhook_url = Some(val);
        }
        if let Some(val) = lookup("RELAYCAST_CHANNELS_WHATSAPP_AUTH_TOKEN") {
            self.channels.whatsapp.auth_token = Some(val);
        }
        if let Some(val) = lookup("RELAYCAST_CHANNELS_WHATSAPP_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                self.channels.whatsapp.timeout_secs = v;
            }
        }

        // Discord
        if let Some(val) = lookup("RELAYCAST_CHANNELS_DISCORD_WEBHOOK_URL") {
            self.channels.discord.webhook_url = Some(val);
        }
        if let Some(val) = lookup("RELAYCAST_CHANNELS_DISCORD_USERNAME") {
            self.channels.discord.username = Some(val);
        }
        if let Some(val) = lookup("RELAYCAST_CHANNELS_DISCORD_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                self.channels.discord.timeout_secs = v;
            }
        }

        // Logging
        if let Some(val) = lookup("RELAYCAST_LOGGING_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = lookup("RELAYCAST_LOGGING_FORMAT") {
            match val.parse() {
                Ok(format) => self.logging.format = format,
                Err(e) => warn!("Ignoring RELAYCAST_LOGGING_FORMAT: {}", e),
            }
        }
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::path())
    }

    /// Save configuration to a specific path, creating parent directories.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
