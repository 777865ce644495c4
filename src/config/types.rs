//! Configuration type definitions for Relaycast
//!
//! All types implement serde traits for JSON serialization and have sensible defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::channels::webhook::DEFAULT_WEBHOOK_TIMEOUT_SECS;

/// Main configuration struct for Relaycast
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Channel configurations (web, WhatsApp, Discord, generic webhooks)
    pub channels: ChannelsConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

// ============================================================================
// Channel Configuration
// ============================================================================

/// Configuration for every channel the factory knows how to build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    /// Passive web channel
    pub web: WebConfig,
    /// WhatsApp bridge webhook
    pub whatsapp: WhatsAppConfig,
    /// Discord webhook
    pub discord: DiscordConfig,
    /// Additional generic webhooks, one handler per entry
    pub webhooks: Vec<WebhookConfig>,
}

/// Web channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Whether the web channel is registered at all
    pub enabled: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// WhatsApp bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsAppConfig {
    /// Bridge endpoint; the channel is inactive while unset
    pub webhook_url: Option<String>,
    /// Bearer token the bridge expects, if any
    pub auth_token: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            auth_token: None,
            timeout_secs: DEFAULT_WEBHOOK_TIMEOUT_SECS,
        }
    }
}

/// Discord webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Execute-webhook URL; the channel is inactive while unset
    pub webhook_url: Option<String>,
    /// Display name override for posted messages
    pub username: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            username: None,
            timeout_secs: DEFAULT_WEBHOOK_TIMEOUT_SECS,
        }
    }
}

/// Generic outbound webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Channel name the handler registers under
    pub name: String,
    /// Endpoint; the channel is inactive while unset
    #[serde(default)]
    pub url: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default = "default_webhook_timeout")]
    pub timeout_secs: u64,
    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_webhook_timeout() -> u64 {
    DEFAULT_WEBHOOK_TIMEOUT_SECS
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output
    Pretty,
    /// Compact single-line output with component fields
    #[default]
    Component,
    /// JSON lines for log aggregators
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "component" => Ok(LogFormat::Component),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Optional log file to append to; stdout otherwise
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Component,
            level: "info".to_string(),
            file: None,
        }
    }
}
