//! Discord webhook channel.
//!
//! Posts to a Discord "execute webhook" URL
//! (`https://discord.com/api/webhooks/<id>/<token>`). No bot token or
//! gateway connection is needed; the URL itself is the credential.

use serde_json::{json, Value};
use std::time::Duration;

use crate::config::DiscordConfig;
use crate::notification::{Notification, Role};
use crate::utils::string::fit_to_limit;

use super::webhook::{PayloadFormat, WebhookChannel, WebhookChannelConfig};

/// Name the Discord channel registers under.
pub const DISCORD_CHANNEL: &str = "discord";

/// Discord rejects message content longer than this many characters.
pub const DISCORD_MAX_MESSAGE_LENGTH: usize = 2000;

/// Builds the Discord handler from config. Unavailable until a webhook URL
/// is configured.
pub fn discord_channel(config: &DiscordConfig) -> WebhookChannel {
    let runtime = WebhookChannelConfig {
        url: config.webhook_url.clone(),
        timeout: Duration::from_secs(config.timeout_secs.max(1)),
        headers: Vec::new(),
    };
    WebhookChannel::new(
        DISCORD_CHANNEL,
        runtime,
        PayloadFormat::Discord {
            username: config.username.clone(),
        },
    )
}

/// Builds a Discord webhook body.
///
/// User messages are prefixed so the channel reads as a transcript. An audio
/// URL is appended on its own line. Content is truncated to Discord's limit
/// and mentions are disabled so relayed text cannot ping anyone.
pub(crate) fn build_payload(n: &Notification, username: Option<&str>) -> Value {
    let mut body = match n.role() {
        Role::User => format!("**User:** {}", n.content()),
        Role::Assistant => n.content().to_string(),
    };
    if let Some(url) = n.audio_url() {
        body.push_str("\n\u{1F50A} ");
        body.push_str(url);
    }

    let content = fit_to_limit(&body, DISCORD_MAX_MESSAGE_LENGTH);

    let username = username.unwrap_or(match n.role() {
        Role::User => "User",
        Role::Assistant => "Assistant",
    });

    json!({
        "content": content,
        "username": username,
        "conversationId": n.conversation_id(),
        "allowed_mentions": { "parse": [] },
    })
}
