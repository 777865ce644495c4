//! Channel factory/registration helpers.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;

use super::{
    discord_channel, whatsapp_channel, ChannelHandler, Router, WebChannel, WebhookChannel,
};

/// Register every channel described by `config`.
///
/// `web` is registered when enabled. `whatsapp` and `discord` are always
/// registered; they report unavailable until a webhook URL is set. Each
/// generic webhook entry becomes its own handler.
///
/// Returns the number of registered channels.
pub async fn register_configured_channels(router: &Router, config: &Config) -> usize {
    let channels = &config.channels;

    if channels.web.enabled {
        router.register_handler(Arc::new(WebChannel::new())).await;
    }

    let whatsapp = whatsapp_channel(&channels.whatsapp);
    log_availability(&whatsapp);
    router.register_handler(Arc::new(whatsapp)).await;

    let discord = discord_channel(&channels.discord);
    log_availability(&discord);
    router.register_handler(Arc::new(discord)).await;

    for hook in &channels.webhooks {
        let name = hook.name.trim();
        if name.is_empty() {
            warn!("Skipping webhook entry with empty name");
            continue;
        }
        if router.has_channel(name).await {
            warn!("Webhook '{}' replaces an already registered channel", name);
        }
        let channel = WebhookChannel::from_config(hook);
        log_availability(&channel);
        router.register_handler(Arc::new(channel)).await;
    }

    let count = router.channel_count().await;
    crate::log_component!(info, "factory", "Channels registered", count = count);
    count
}

fn log_availability(channel: &WebhookChannel) {
    if !channel.is_available() {
        info!("Channel {} registered without endpoint (inactive)", channel.name());
    }
}
