//! Channel listing command handler.

use anyhow::Result;

use relaycast::channels::{register_configured_channels, Router};
use relaycast::config::Config;

/// List registered channels and their availability.
pub(crate) async fn cmd_channels(config: &Config) -> Result<()> {
    let router = Router::new();
    register_configured_channels(&router, config).await;

    let active = router.get_active_channels().await;
    println!("Channels:");
    for name in router.channels().await {
        let state = if active.contains(&name) {
            "active"
        } else {
            "inactive (no endpoint)"
        };
        println!("  {:<16} {}", name, state);
    }
    println!("\n{} active", active.len());
    Ok(())
}
