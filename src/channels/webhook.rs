//! Outbound webhook channel.
//!
//! Delivers a notification with a single HTTP POST carrying a JSON body. The
//! body shape depends on the [`PayloadFormat`]: a generic notification
//! envelope, a WhatsApp bridge message, or a Discord webhook execution.
//!
//! # Request Format (generic)
//!
//! ```json
//! POST <webhook_url> HTTP/1.1
//! Content-Type: application/json
//!
//! {
//!     "messageId": "6f0c...",
//!     "conversationId": "conv-42",
//!     "role": "assistant",
//!     "content": "Hello!",
//!     "audioUrl": null,
//!     "timestamp": "2024-05-01T12:00:00Z",
//!     "sourceChannel": "web"
//! }
//! ```
//!
//! Any non-2xx response, connect error or timeout counts as a failed
//! delivery.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::RwLock;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::WebhookConfig;
use crate::notification::Notification;

use super::{discord, whatsapp, ChannelHandler};

/// Default per-request timeout for webhook delivery.
pub const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 10;

/// Body shape a webhook endpoint expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadFormat {
    /// Full notification envelope.
    Generic,
    /// WhatsApp bridge message (`type`, `mediaUrl`, ...).
    WhatsApp,
    /// Discord "execute webhook" body with an optional display name.
    Discord { username: Option<String> },
}

impl PayloadFormat {
    /// Builds the JSON body for `notification`.
    pub fn build(&self, notification: &Notification) -> Value {
        match self {
            PayloadFormat::Generic => generic_payload(notification),
            PayloadFormat::WhatsApp => whatsapp::build_payload(notification),
            PayloadFormat::Discord { username } => {
                discord::build_payload(notification, username.as_deref())
            }
        }
    }
}

fn generic_payload(n: &Notification) -> Value {
    json!({
        "messageId": n.message_id(),
        "conversationId": n.conversation_id(),
        "role": n.role().as_str(),
        "content": n.content(),
        "audioUrl": n.audio_url(),
        "timestamp": n.timestamp().to_rfc3339(),
        "sourceChannel": n.source_channel(),
    })
}

/// Runtime configuration for a webhook handler.
///
/// This is the internal runtime configuration, not the serde config struct
/// that lives in `config/types.rs`.
#[derive(Debug, Clone)]
pub struct WebhookChannelConfig {
    /// Endpoint to POST to. `None` (or blank) makes the channel unavailable.
    pub url: Option<String>,
    /// Upper bound on one delivery attempt.
    pub timeout: Duration,
    /// Extra request headers (e.g. an auth token the receiver expects).
    pub headers: Vec<(String, String)>,
}

impl Default for WebhookChannelConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout: Duration::from_secs(DEFAULT_WEBHOOK_TIMEOUT_SECS),
            headers: Vec::new(),
        }
    }
}

impl WebhookChannelConfig {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }
}

/// Generic outbound webhook handler.
///
/// Available only while an endpoint URL is set. The URL can be swapped at
/// runtime with [`WebhookChannel::set_endpoint`]; the router picks up the
/// change on its next active-channel evaluation.
pub struct WebhookChannel {
    name: String,
    url: RwLock<Option<String>>,
    timeout: Duration,
    headers: Vec<(String, String)>,
    format: PayloadFormat,
    client: reqwest::Client,
}

impl WebhookChannel {
    /// Creates a new webhook handler.
    ///
    /// # Example
    ///
    /// ```
    /// use relaycast::channels::{ChannelHandler, PayloadFormat, WebhookChannel, WebhookChannelConfig};
    ///
    /// let channel = WebhookChannel::new("crm", WebhookChannelConfig::default(), PayloadFormat::Generic);
    /// assert_eq!(channel.name(), "crm");
    /// assert!(!channel.is_available()); // no URL configured
    /// ```
    pub fn new(name: &str, config: WebhookChannelConfig, format: PayloadFormat) -> Self {
        Self {
            name: name.to_string(),
            url: RwLock::new(normalize_url(config.url)),
            timeout: config.timeout,
            headers: config.headers,
            format,
            client: reqwest::Client::new(),
        }
    }

    /// Builds a generic-format handler from its config entry.
    pub fn from_config(config: &WebhookConfig) -> Self {
        let runtime = WebhookChannelConfig {
            url: config.url.clone(),
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
            headers: config
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };
        Self::new(config.name.trim(), runtime, PayloadFormat::Generic)
    }

    /// Returns the configured endpoint, if any.
    pub fn endpoint(&self) -> Option<String> {
        match self.url.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Sets or clears the endpoint.
    pub fn set_endpoint(&self, url: Option<String>) {
        let url = normalize_url(url);
        match self.url.write() {
            Ok(mut guard) => *guard = url,
            Err(poisoned) => *poisoned.into_inner() = url,
        }
    }

    pub fn format(&self) -> &PayloadFormat {
        &self.format
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the request body this handler would send for `notification`.
    pub fn build_payload(&self, notification: &Notification) -> Value {
        self.format.build(notification)
    }
}

fn normalize_url(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
}

#[async_trait]
impl ChannelHandler for WebhookChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.endpoint().is_some()
    }

    async fn send(&self, notification: &Notification) -> bool {
        let Some(url) = self.endpoint() else {
            warn!("{}: webhook URL not configured, skipping", self.name);
            return false;
        };

        let payload = self.build_payload(notification);
        let mut request = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&payload);
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                info!(
                    message_id = %notification.message_id(),
                    "{}: message delivered", self.name
                );
                true
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                warn!(
                    message_id = %notification.message_id(),
                    "{}: webhook returned HTTP {}: {}",
                    self.name,
                    status,
                    crate::utils::string::preview(&body, 200)
                );
                false
            }
            Err(e) => {
                warn!(
                    message_id = %notification.message_id(),
                    "{}: webhook request failed: {}", self.name, e
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::Role;
    use mockito::Matcher;
    use std::collections::HashMap;

    fn note() -> Notification {
        Notification::builder("m1", "conv-9", Role::Assistant, "Hello there")
            .source_channel("whatsapp")
            .build()
            .unwrap()
    }

    #[test]
    fn test_unavailable_without_url() {
        let channel = WebhookChannel::new(
            "hook",
            WebhookChannelConfig::default(),
            PayloadFormat::Generic,
        );
        assert!(!channel.is_available());
    }

    #[test]
    fn test_blank_url_is_unavailable() {
        let channel = WebhookChannel::new(
            "hook",
            WebhookChannelConfig::with_url("   "),
            PayloadFormat::Generic,
        );
        assert!(!channel.is_available());
    }

    #[test]
    fn test_set_endpoint_flips_availability() {
        let channel = WebhookChannel::new(
            "hook",
            WebhookChannelConfig::default(),
            PayloadFormat::Generic,
        );
        channel.set_endpoint(Some("https://example.com/hook".to_string()));
        assert!(channel.is_available());
        channel.set_endpoint(None);
        assert!(!channel.is_available());
    }

    #[test]
    fn test_generic_payload_shape() {
        let payload = PayloadFormat::Generic.build(&note());
        assert_eq!(payload["messageId"], "m1");
        assert_eq!(payload["conversationId"], "conv-9");
        assert_eq!(payload["role"], "assistant");
        assert_eq!(payload["content"], "Hello there");
        assert_eq!(payload["sourceChannel"], "whatsapp");
        assert!(payload["audioUrl"].is_null());
    }

    #[test]
    fn test_from_config_clamps_zero_timeout() {
        let config = WebhookConfig {
            name: "crm".to_string(),
            url: Some("https://crm.example.com/in".to_string()),
            timeout_secs: 0,
            headers: HashMap::new(),
        };
        let channel = WebhookChannel::from_config(&config);
        assert_eq!(channel.name(), "crm");
        assert_eq!(channel.timeout(), Duration::from_secs(1));
        assert_eq!(channel.format(), &PayloadFormat::Generic);
    }

    #[tokio::test]
    async fn test_send_without_url_fails_closed() {
        let channel = WebhookChannel::new(
            "hook",
            WebhookChannelConfig::default(),
            PayloadFormat::Generic,
        );
        assert!(!channel.send(&note()).await);
    }

    #[tokio::test]
    async fn test_send_success_posts_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_header("x-relay-token", "secret")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "conversationId": "conv-9",
                "content": "Hello there"
            })))
            .with_status(200)
            .create_async()
            .await;

        let config = WebhookChannelConfig {
            url: Some(format!("{}/hook", server.url())),
            headers: vec![("x-relay-token".to_string(), "secret".to_string())],
            ..Default::default()
        };
        let channel = WebhookChannel::new("hook", config, PayloadFormat::Generic);

        assert!(channel.send(&note()).await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_non_success_status_fails() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/hook")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let channel = WebhookChannel::new(
            "hook",
            WebhookChannelConfig::with_url(format!("{}/hook", server.url())),
            PayloadFormat::Generic,
        );
        assert!(!channel.send(&note()).await);
    }

    #[tokio::test]
    async fn test_send_connection_error_fails() {
        // Port 9 (discard) on localhost is not listening in test environments.
        let channel = WebhookChannel::new(
            "hook",
            WebhookChannelConfig {
                url: Some("http://127.0.0.1:9/hook".to_string()),
                timeout: Duration::from_secs(2),
                headers: Vec::new(),
            },
            PayloadFormat::Generic,
        );
        assert!(!channel.send(&note()).await);
    }
}
