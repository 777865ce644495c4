//! Channel handler trait for Relaycast
//!
//! This module defines the `ChannelHandler` trait that every delivery channel
//! (web, WhatsApp bridge, Discord webhook, generic webhook) implements.

use async_trait::async_trait;

use crate::notification::Notification;

/// The `ChannelHandler` trait defines how to reach one external channel.
///
/// Handlers are responsible for:
/// - Reporting whether they can currently deliver (`is_available`)
/// - Delivering a notification and reporting acceptance (`send`)
///
/// `send` fails closed: transport errors, non-success responses and any
/// other failure are logged inside the handler and reported as `false`.
/// A handler never retries on its own.
///
/// # Example Implementation
///
/// ```
/// use async_trait::async_trait;
/// use relaycast::channels::ChannelHandler;
/// use relaycast::notification::Notification;
///
/// struct LogChannel;
///
/// #[async_trait]
/// impl ChannelHandler for LogChannel {
///     fn name(&self) -> &str {
///         "log"
///     }
///
///     fn is_available(&self) -> bool {
///         true
///     }
///
///     async fn send(&self, notification: &Notification) -> bool {
///         println!("{}: {}", notification.role(), notification.content());
///         true
///     }
/// }
/// ```
#[async_trait]
pub trait ChannelHandler: Send + Sync {
    /// Returns the unique name of this channel (e.g., "web", "discord").
    ///
    /// The router keys its registry by this name.
    fn name(&self) -> &str;

    /// Returns whether the channel can currently deliver.
    ///
    /// Must be cheap and free of network I/O; it may reflect configuration
    /// state such as whether an endpoint URL is set.
    fn is_available(&self) -> bool;

    /// Delivers the notification.
    ///
    /// # Returns
    ///
    /// `true` if the remote channel accepted the message, `false` otherwise.
    async fn send(&self, notification: &Notification) -> bool;
}
