//! Notification type passed to every channel handler during a broadcast.
//!
//! A `Notification` is immutable once built. All validation happens in
//! [`NotificationBuilder::build`] (or during deserialization), so a value that
//! reaches the router is always well formed and malformed input fails at the
//! call site rather than inside a dispatch task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{RelayError, Result};

/// Channel assumed to have produced a message when the caller does not say.
pub const DEFAULT_SOURCE_CHANNEL: &str = "web";

/// Author of a message within a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(RelayError::InvalidNotification(format!(
                "unknown role '{}'",
                other
            ))),
        }
    }
}

/// One message to fan out across channels.
///
/// Serialized field names are camelCase (`messageId`, `conversationId`, ...)
/// so the generic webhook payload can reuse this shape directly.
///
/// # Example
///
/// ```
/// use relaycast::notification::{Notification, Role};
///
/// let n = Notification::builder("msg-1", "conv-1", Role::User, "hello")
///     .source_channel("whatsapp")
///     .target_channels(["web", "discord"])
///     .build()
///     .unwrap();
///
/// assert_eq!(n.source_channel(), "whatsapp");
/// assert_eq!(n.target_channels().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawNotification")]
pub struct Notification {
    message_id: String,
    conversation_id: String,
    role: Role,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio_url: Option<String>,
    timestamp: DateTime<Utc>,
    source_channel: String,
    target_channels: Vec<String>,
}

impl Notification {
    /// Starts a builder with the required fields.
    pub fn builder(
        message_id: impl Into<String>,
        conversation_id: impl Into<String>,
        role: Role,
        content: impl Into<String>,
    ) -> NotificationBuilder {
        NotificationBuilder {
            message_id: message_id.into(),
            conversation_id: conversation_id.into(),
            role,
            content: content.into(),
            audio_url: None,
            timestamp: None,
            source_channel: None,
            target_channels: Vec::new(),
        }
    }

    /// Builds a notification with defaults for every optional field.
    pub fn new(
        message_id: impl Into<String>,
        conversation_id: impl Into<String>,
        role: Role,
        content: impl Into<String>,
    ) -> Result<Self> {
        Self::builder(message_id, conversation_id, role, content).build()
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn audio_url(&self) -> Option<&str> {
        self.audio_url.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn source_channel(&self) -> &str {
        &self.source_channel
    }

    /// Channels the caller asked for. Empty means "every active channel".
    pub fn target_channels(&self) -> &[String] {
        &self.target_channels
    }

    /// Returns true if this notification carries an audio attachment.
    pub fn has_audio(&self) -> bool {
        self.audio_url.is_some()
    }
}

/// Builder for [`Notification`].
#[derive(Debug, Clone)]
pub struct NotificationBuilder {
    message_id: String,
    conversation_id: String,
    role: Role,
    content: String,
    audio_url: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    source_channel: Option<String>,
    target_channels: Vec<String>,
}

impl NotificationBuilder {
    pub fn audio_url(mut self, url: impl Into<String>) -> Self {
        self.audio_url = Some(url.into());
        self
    }

    /// Sets an optional audio URL, leaving it unset on `None`.
    pub fn maybe_audio_url(mut self, url: Option<String>) -> Self {
        self.audio_url = url;
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn source_channel(mut self, channel: impl Into<String>) -> Self {
        self.source_channel = Some(channel.into());
        self
    }

    pub fn target_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_channels = channels.into_iter().map(Into::into).collect();
        self
    }

    /// Validates and produces the notification.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidNotification`] if the message id,
    /// conversation id, source channel, or any target channel name is blank.
    pub fn build(self) -> Result<Notification> {
        let notification = Notification {
            message_id: self.message_id,
            conversation_id: self.conversation_id,
            role: self.role,
            content: self.content,
            audio_url: self.audio_url.filter(|u| !u.trim().is_empty()),
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            source_channel: self
                .source_channel
                .unwrap_or_else(|| DEFAULT_SOURCE_CHANNEL.to_string()),
            target_channels: self.target_channels,
        };
        validate(&notification)?;
        Ok(notification)
    }
}

fn validate(n: &Notification) -> Result<()> {
    if n.message_id.trim().is_empty() {
        return Err(RelayError::InvalidNotification(
            "message_id is empty".to_string(),
        ));
    }
    if n.conversation_id.trim().is_empty() {
        return Err(RelayError::InvalidNotification(
            "conversation_id is empty".to_string(),
        ));
    }
    if n.source_channel.trim().is_empty() {
        return Err(RelayError::InvalidNotification(
            "source_channel is empty".to_string(),
        ));
    }
    if n.target_channels.iter().any(|c| c.trim().is_empty()) {
        return Err(RelayError::InvalidNotification(
            "target_channels contains an empty name".to_string(),
        ));
    }
    Ok(())
}

/// Wire form accepted during deserialization, before validation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNotification {
    message_id: String,
    conversation_id: String,
    role: Role,
    #[serde(default)]
    content: String,
    #[serde(default)]
    audio_url: Option<String>,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    source_channel: Option<String>,
    #[serde(default)]
    target_channels: Vec<String>,
}

impl TryFrom<RawNotification> for Notification {
    type Error = RelayError;

    fn try_from(raw: RawNotification) -> Result<Self> {
        let mut builder =
            Notification::builder(raw.message_id, raw.conversation_id, raw.role, raw.content)
                .maybe_audio_url(raw.audio_url)
                .target_channels(raw.target_channels);
        if let Some(ts) = raw.timestamp {
            builder = builder.timestamp(ts);
        }
        if let Some(source) = raw.source_channel {
            builder = builder.source_channel(source);
        }
        builder.build()
    }
}
