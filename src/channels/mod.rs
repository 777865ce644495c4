//! Channels module - delivery channels and the broadcast router
//!
//! This module provides everything needed to fan one message out to many
//! communication channels and track where it landed.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Router                             │
//! │                                                             │
//! │  ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌─────────┐        │
//! │  │   Web   │  │WhatsApp │  │ Discord │  │ Webhook │  ...   │
//! │  └────┬────┘  └────┬────┘  └────┬────┘  └────┬────┘        │
//! │       │            │ implements │            │              │
//! │       │            │  Channel-  │            │              │
//! │       │            │  Handler   │            │              │
//! │       └────────────┴─────┬──────┴────────────┘              │
//! │                          │ true results                     │
//! │                  ┌───────┴────────┐                         │
//! │                  │ DeliveryLedger │                         │
//! │                  └────────────────┘                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use relaycast::channels::{register_configured_channels, Router};
//! use relaycast::config::Config;
//!
//! # tokio_test::block_on(async {
//! let router = Router::new();
//! let count = register_configured_channels(&router, &Config::default()).await;
//! assert_eq!(count, 3);
//!
//! // Only the web channel has everything it needs by default.
//! assert_eq!(router.get_active_channels().await, vec!["web"]);
//! # })
//! ```

pub mod discord;
mod factory;
pub mod ledger;
mod router;
pub mod status;
mod types;
pub mod web;
pub mod webhook;
pub mod whatsapp;

pub use discord::{discord_channel, DISCORD_CHANNEL};
pub use factory::register_configured_channels;
pub use ledger::DeliveryLedger;
pub use router::Router;
pub use status::{BroadcastReport, DeliveryStatus};
pub use types::ChannelHandler;
pub use web::{WebChannel, WEB_CHANNEL};
pub use webhook::{PayloadFormat, WebhookChannel, WebhookChannelConfig};
pub use whatsapp::{whatsapp_channel, WHATSAPP_CHANNEL};
