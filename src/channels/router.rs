//! Broadcast router for Relaycast
//!
//! This module provides the `Router`, which is responsible for:
//! - Registering channel handlers by name
//! - Listing the channels that can currently deliver
//! - Fanning a notification out to many channels in parallel
//! - Recording confirmed deliveries in the [`DeliveryLedger`]
//! - Reporting per-message delivery status

use futures::future::join_all;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use crate::notification::Notification;

use super::ledger::DeliveryLedger;
use super::status::DeliveryStatus;
use super::ChannelHandler;

/// The `Router` owns the handler registry and the delivery ledger.
///
/// Construct one per process (or per test) and share it behind an `Arc`.
///
/// # Architecture
///
/// ```text
///                 ┌──────────────────────────────┐
///  Notification ─>│            Router            │
///                 │  resolve targets, drop source│
///                 └──────┬───────┬───────┬───────┘
///                  spawn │ spawn │ spawn │
///                  ┌─────┴──┐ ┌──┴─────┐ ┌┴────────┐
///                  │  web   │ │whatsapp│ │ discord │  ...
///                  └─────┬──┘ └──┬─────┘ └┬────────┘
///                        └───────┼────────┘
///                          join  │ true ─> DeliveryLedger
///                                ▼
///                      HashMap<channel, bool>
/// ```
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use relaycast::channels::{Router, WebChannel};
/// use relaycast::notification::{Notification, Role};
///
/// # tokio_test::block_on(async {
/// let router = Router::new();
/// router.register_handler(Arc::new(WebChannel::new())).await;
///
/// let n = Notification::new("msg-1", "conv-1", Role::Assistant, "hi").unwrap();
/// let results = router.broadcast_to_all(&n).await;
/// assert_eq!(results.get("web"), Some(&true));
///
/// let status = router.get_delivery_status("msg-1").await;
/// assert_eq!(status.delivered, vec!["web"]);
/// assert!(status.pending.is_empty());
/// # })
/// ```
#[derive(Default)]
pub struct Router {
    /// Map of channel name to handler
    handlers: RwLock<HashMap<String, Arc<dyn ChannelHandler>>>,
    /// Confirmed deliveries per message id
    ledger: DeliveryLedger,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under its name, replacing any handler already
    /// registered with that name.
    pub async fn register_handler(&self, handler: Arc<dyn ChannelHandler>) {
        let name = handler.name().to_string();
        let mut handlers = self.handlers.write().await;
        if handlers.insert(name.clone(), handler).is_some() {
            info!("Replaced channel handler: {}", name);
        } else {
            info!("Registering channel: {}", name);
        }
    }

    /// Returns the names of all registered handlers, sorted.
    pub async fn channels(&self) -> Vec<String> {
        let handlers = self.handlers.read().await;
        let mut names: Vec<String> = handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of registered handlers.
    pub async fn channel_count(&self) -> usize {
        self.handlers.read().await.len()
    }

    /// Checks if a handler with the given name is registered.
    pub async fn has_channel(&self, name: &str) -> bool {
        self.handlers.read().await.contains_key(name)
    }

    /// Returns the names of registered handlers whose `is_available()` is
    /// true right now, sorted. Never cached.
    pub async fn get_active_channels(&self) -> Vec<String> {
        let handlers = self.handlers.read().await;
        let mut active: Vec<String> = handlers
            .iter()
            .filter(|(_, handler)| handler.is_available())
            .map(|(name, _)| name.clone())
            .collect();
        active.sort();
        active
    }

    /// Tells every other channel about this notification (the source channel
    /// is skipped).
    pub async fn broadcast_response(&self, notification: &Notification) -> HashMap<String, bool> {
        self.broadcast_to_all_channels(notification, true).await
    }

    /// Tells every channel about this notification, the source included.
    pub async fn broadcast_to_all(&self, notification: &Notification) -> HashMap<String, bool> {
        self.broadcast_to_all_channels(notification, false).await
    }

    /// Fans `notification` out and waits for every dispatch to settle.
    ///
    /// Targets are `notification.target_channels()`, or the active channels
    /// when that list is empty. With `exclude_source` the source channel is
    /// removed. Names without a registered handler map to `false`. Every
    /// remaining handler runs in its own task; a panicking handler maps to
    /// `false` without affecting the others.
    ///
    /// The returned map has exactly one key per distinct resolved target.
    pub async fn broadcast_to_all_channels(
        &self,
        notification: &Notification,
        exclude_source: bool,
    ) -> HashMap<String, bool> {
        let mut targets: BTreeSet<String> = if notification.target_channels().is_empty() {
            self.get_active_channels().await.into_iter().collect()
        } else {
            notification.target_channels().iter().cloned().collect()
        };
        if exclude_source {
            targets.remove(notification.source_channel());
        }

        let mut results = HashMap::with_capacity(targets.len());
        let mut dispatch = Vec::with_capacity(targets.len());
        {
            let handlers = self.handlers.read().await;
            for name in targets {
                match handlers.get(&name) {
                    Some(handler) => dispatch.push((name, Arc::clone(handler))),
                    None => {
                        warn!(
                            message_id = %notification.message_id(),
                            "No handler registered for channel: {}", name
                        );
                        results.insert(name, false);
                    }
                }
            }
        }

        let shared = Arc::new(notification.clone());
        let settled = join_all(
            dispatch
                .into_iter()
                .map(|(name, handler)| self.dispatch(name, handler, Arc::clone(&shared))),
        )
        .await;
        results.extend(settled);

        let delivered = results.values().filter(|ok| **ok).count();
        crate::log_component!(
            info,
            "router",
            "Broadcast settled",
            message_id = notification.message_id(),
            conversation_id = notification.conversation_id(),
            exclude_source = exclude_source,
            delivered = delivered,
            targets = results.len(),
        );
        results
    }

    /// Sends to exactly one channel, skipping target resolution.
    ///
    /// Returns `false` if no handler is registered under `channel`.
    pub async fn send_to_channel(&self, channel: &str, notification: &Notification) -> bool {
        let handler = self.handlers.read().await.get(channel).cloned();
        match handler {
            Some(handler) => {
                let (_, delivered) = self
                    .dispatch(
                        channel.to_string(),
                        handler,
                        Arc::new(notification.clone()),
                    )
                    .await;
                delivered
            }
            None => {
                warn!(
                    message_id = %notification.message_id(),
                    "Channel not found: {}", channel
                );
                false
            }
        }
    }

    /// Delivery status for `message_id`.
    ///
    /// `delivered` is the ledger entry. `pending` is every channel active now
    /// that is not in `delivered`, regardless of what was targeted.
    pub async fn get_delivery_status(&self, message_id: &str) -> DeliveryStatus {
        let delivered = self.ledger.delivered(message_id).await;
        let pending = self
            .get_active_channels()
            .await
            .into_iter()
            .filter(|name| !delivered.contains(name))
            .collect();
        DeliveryStatus { delivered, pending }
    }

    /// Overwrites the ledger entry for `message_id` with the current active
    /// channel set.
    pub async fn mark_fully_delivered(&self, message_id: &str) {
        let active = self.get_active_channels().await;
        debug!(message_id, "Marking fully delivered to {:?}", active);
        self.ledger.replace(message_id, active).await;
    }

    /// Returns a reference to the delivery ledger.
    pub fn ledger(&self) -> &DeliveryLedger {
        &self.ledger
    }

    /// Runs one handler in its own task and records a confirmed delivery.
    async fn dispatch(
        &self,
        name: String,
        handler: Arc<dyn ChannelHandler>,
        notification: Arc<Notification>,
    ) -> (String, bool) {
        let message_id = notification.message_id().to_string();
        debug!(message_id = %message_id, "Dispatching to channel: {}", name);

        let joined = tokio::spawn(async move { handler.send(&notification).await }).await;
        let delivered = settle(&name, joined);
        if delivered {
            self.ledger.record(&message_id, &name).await;
        } else {
            debug!(message_id = %message_id, "Channel {} did not accept message", name);
        }
        (name, delivered)
    }
}

fn settle(channel: &str, joined: std::result::Result<bool, JoinError>) -> bool {
    match joined {
        Ok(delivered) => delivered,
        Err(e) if e.is_panic() => {
            error!("Channel handler {} panicked during send", channel);
            false
        }
        Err(e) => {
            error!("Channel handler {} task failed: {}", channel, e);
            false
        }
    }
}
