//! Passive web channel.
//!
//! Web clients poll (or hold a socket) for conversation updates, so there is
//! nothing to push. The handler is always available and acknowledges every
//! notification.

use async_trait::async_trait;
use tracing::debug;

use crate::notification::Notification;

use super::ChannelHandler;

/// Name the web channel registers under.
pub const WEB_CHANNEL: &str = "web";

/// Always-available, no-op channel for pull-based web clients.
#[derive(Debug, Clone, Default)]
pub struct WebChannel;

impl WebChannel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChannelHandler for WebChannel {
    fn name(&self) -> &str {
        WEB_CHANNEL
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn send(&self, notification: &Notification) -> bool {
        debug!(
            message_id = %notification.message_id(),
            conversation_id = %notification.conversation_id(),
            "Web: update queued for client pull"
        );
        true
    }
}
