//! RelayCast - multi-channel message broadcast router
//!
//! Fans one conversation message out to every registered delivery channel
//! (web, WhatsApp, Discord, generic webhooks), isolates per-channel
//! failures, and keeps a ledger of which channels confirmed each message.

pub mod channels;
pub mod config;
pub mod error;
pub mod notification;
pub mod orchestrator;
pub mod utils;

pub use channels::{BroadcastReport, ChannelHandler, DeliveryStatus, Router};
pub use config::Config;
pub use error::{RelayError, Result};
pub use notification::{Notification, Role};
pub use orchestrator::{InboundChat, MessageStore, Orchestrator};
