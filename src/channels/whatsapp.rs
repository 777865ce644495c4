//! WhatsApp channel (via an HTTP messaging bridge).
//!
//! The bridge owns the WhatsApp session and exposes an inbound webhook.
//! Relaycast only POSTs JSON messages to it.
//!
//! # Bridge Protocol
//!
//! ```json
//! {"type":"text","conversationId":"conv-1","messageId":"m1","role":"assistant","content":"Hi","mediaUrl":null,"timestamp":"2024-05-01T12:00:00+00:00"}
//! {"type":"audio","conversationId":"conv-1","messageId":"m2","role":"assistant","content":"Hi","mediaUrl":"https://cdn/x.mp3","timestamp":"..."}
//! ```

use serde_json::{json, Value};
use std::time::Duration;

use crate::config::WhatsAppConfig;
use crate::notification::Notification;
use crate::utils::string::fit_to_limit;

use super::webhook::{PayloadFormat, WebhookChannel, WebhookChannelConfig};

/// Name the WhatsApp channel registers under.
pub const WHATSAPP_CHANNEL: &str = "whatsapp";

/// WhatsApp text bodies are capped at 4096 characters.
const WHATSAPP_MAX_TEXT_LENGTH: usize = 4096;

/// Builds the WhatsApp handler from config. Unavailable until a bridge
/// webhook URL is configured.
pub fn whatsapp_channel(config: &WhatsAppConfig) -> WebhookChannel {
    let runtime = WebhookChannelConfig {
        url: config.webhook_url.clone(),
        timeout: Duration::from_secs(config.timeout_secs.max(1)),
        headers: config
            .auth_token
            .as_ref()
            .map(|token| vec![("Authorization".to_string(), format!("Bearer {}", token))])
            .unwrap_or_default(),
    };
    WebhookChannel::new(WHATSAPP_CHANNEL, runtime, PayloadFormat::WhatsApp)
}

pub(crate) fn build_payload(n: &Notification) -> Value {
    let message_type = if n.has_audio() { "audio" } else { "text" };
    let content = fit_to_limit(n.content(), WHATSAPP_MAX_TEXT_LENGTH);

    json!({
        "type": message_type,
        "conversationId": n.conversation_id(),
        "messageId": n.message_id(),
        "role": n.role().as_str(),
        "content": content,
        "mediaUrl": n.audio_url(),
        "timestamp": n.timestamp().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::ChannelHandler;
    use crate::notification::Role;

    #[test]
    fn test_channel_name() {
        assert_eq!(
            whatsapp_channel(&WhatsAppConfig::default()).name(),
            "whatsapp"
        );
    }

    #[test]
    fn test_availability_follows_url() {
        assert!(!whatsapp_channel(&WhatsAppConfig::default()).is_available());
        let config = WhatsAppConfig {
            webhook_url: Some("http://localhost:3001/send".to_string()),
            ..Default::default()
        };
        assert!(whatsapp_channel(&config).is_available());
    }

    #[test]
    fn test_text_payload() {
        let n = Notification::new("m1", "conv-1", Role::Assistant, "Hi").unwrap();
        let payload = build_payload(&n);
        assert_eq!(payload["type"], "text");
        assert_eq!(payload["conversationId"], "conv-1");
        assert_eq!(payload["content"], "Hi");
        assert!(payload["mediaUrl"].is_null());
    }

    #[test]
    fn test_audio_payload() {
        let n = Notification::builder("m2", "conv-1", Role::Assistant, "Hi")
            .audio_url("https://cdn.example.com/x.mp3")
            .build()
            .unwrap();
        let payload = build_payload(&n);
        assert_eq!(payload["type"], "audio");
        assert_eq!(payload["mediaUrl"], "https://cdn.example.com/x.mp3");
    }

    #[test]
    fn test_long_text_truncated() {
        let n = Notification::new("m1", "c1", Role::Assistant, "z".repeat(5000)).unwrap();
        let payload = build_payload(&n);
        assert_eq!(
            payload["content"].as_str().unwrap().chars().count(),
            WHATSAPP_MAX_TEXT_LENGTH
        );
    }

    #[tokio::test]
    async fn test_send_includes_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/send")
            .match_header("authorization", "Bearer bridge-secret")
            .with_status(202)
            .create_async()
            .await;

        let config = WhatsAppConfig {
            webhook_url: Some(format!("{}/send", server.url())),
            auth_token: Some("bridge-secret".to_string()),
            ..Default::default()
        };
        let channel = whatsapp_channel(&config);
        let n = Notification::new("m1", "c1", Role::User, "hey").unwrap();

        assert!(channel.send(&n).await);
        mock.assert_async().await;
    }
}
