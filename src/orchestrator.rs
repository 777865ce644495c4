//! Conversation orchestrator.
//!
//! Drives one chat turn across the router: store the inbound message, tell
//! the other channels about it, generate (and optionally voice) a reply,
//! store the reply, broadcast it everywhere, and write the delivered channel
//! list back onto the reply record.
//!
//! Persistence, generation and synthesis are collaborators behind traits so
//! the orchestrator can be exercised with in-memory or mock implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::channels::{BroadcastReport, DeliveryStatus, Router};
use crate::error::{RelayError, Result};
use crate::notification::{Notification, Role, DEFAULT_SOURCE_CHANNEL};

/// A persisted conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    pub audio_url: Option<String>,
    /// Channel the message arrived on (or was generated for)
    pub channel: String,
    pub created_at: DateTime<Utc>,
    /// Comma-joined list of channels that confirmed delivery
    pub delivery_status: Option<String>,
}

/// Durable message storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn save_message(&self, message: &StoredMessage) -> Result<()>;

    /// Writes the delivered-channels field of an existing record.
    async fn set_delivery_status(&self, message_id: &str, delivered: &str) -> Result<()>;

    async fn get_message(&self, message_id: &str) -> Result<Option<StoredMessage>>;
}

/// Produces the assistant's reply text.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(&self, conversation_id: &str, prompt: &str) -> Result<String>;
}

/// Turns reply text into a hosted audio clip.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Returns the audio URL, or `None` when nothing was produced.
    async fn synthesize(&self, text: &str) -> Result<Option<String>>;
}

/// `HashMap`-backed store for tests and single-process use.
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    messages: RwLock<HashMap<String, StoredMessage>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages of a conversation, oldest first.
    pub async fn conversation(&self, conversation_id: &str) -> Vec<StoredMessage> {
        let messages = self.messages.read().await;
        let mut found: Vec<StoredMessage> = messages
            .values()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        found.sort_by_key(|m| m.created_at);
        found
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn save_message(&self, message: &StoredMessage) -> Result<()> {
        let mut messages = self.messages.write().await;
        messages.insert(message.id.clone(), message.clone());
        Ok(())
    }

    async fn set_delivery_status(&self, message_id: &str, delivered: &str) -> Result<()> {
        let mut messages = self.messages.write().await;
        let message = messages
            .get_mut(message_id)
            .ok_or_else(|| RelayError::NotFound(format!("message {}", message_id)))?;
        message.delivery_status = Some(delivered.to_string());
        Ok(())
    }

    async fn get_message(&self, message_id: &str) -> Result<Option<StoredMessage>> {
        Ok(self.messages.read().await.get(message_id).cloned())
    }
}

/// Generator that repeats the prompt back. Useful for wiring checks.
#[derive(Debug, Clone, Default)]
pub struct EchoGenerator;

#[async_trait]
impl ReplyGenerator for EchoGenerator {
    async fn generate(&self, _conversation_id: &str, prompt: &str) -> Result<String> {
        Ok(format!("Echo: {}", prompt))
    }
}

/// One inbound chat message.
#[derive(Debug, Clone)]
pub struct InboundChat {
    pub conversation_id: String,
    pub content: String,
    /// Channel the message came from
    pub source_channel: String,
    /// Restrict fan-out to these channels; empty means all active
    pub target_channels: Vec<String>,
    /// Caller-supplied id; generated when absent
    pub message_id: Option<String>,
}

impl InboundChat {
    pub fn new(conversation_id: &str, content: &str) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            content: content.to_string(),
            source_channel: DEFAULT_SOURCE_CHANNEL.to_string(),
            target_channels: Vec::new(),
            message_id: None,
        }
    }

    pub fn from_channel(mut self, channel: &str) -> Self {
        self.source_channel = channel.to_string();
        self
    }

    pub fn with_targets(mut self, targets: Vec<String>) -> Self {
        self.target_channels = targets;
        self
    }

    pub fn with_message_id(mut self, id: &str) -> Self {
        self.message_id = Some(id.to_string());
        self
    }
}

/// Result of one chat turn.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub user_message_id: String,
    pub reply_message_id: String,
    pub reply: String,
    pub audio_url: Option<String>,
    /// Fan-out of the user's message to the other channels
    pub user_delivery: BroadcastReport,
    /// Fan-out of the reply to every channel
    pub reply_delivery: BroadcastReport,
    /// Ledger view of the reply after broadcast
    pub reply_status: DeliveryStatus,
}

/// Runs chat turns against a shared [`Router`].
pub struct Orchestrator {
    router: Arc<Router>,
    store: Arc<dyn MessageStore>,
    generator: Arc<dyn ReplyGenerator>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
}

impl Orchestrator {
    pub fn new(
        router: Arc<Router>,
        store: Arc<dyn MessageStore>,
        generator: Arc<dyn ReplyGenerator>,
    ) -> Self {
        Self {
            router,
            store,
            generator,
            synthesizer: None,
        }
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Handles one inbound message end to end.
    ///
    /// # Errors
    ///
    /// Store, generation and notification-validation failures propagate.
    /// Channel delivery failures never do; they show up in the outcome.
    pub async fn handle_inbound(&self, inbound: InboundChat) -> Result<ChatOutcome> {
        let user_id = inbound
            .message_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let user_note = Notification::builder(
            &user_id,
            &inbound.conversation_id,
            Role::User,
            &inbound.content,
        )
        .source_channel(&inbound.source_channel)
        .target_channels(inbound.target_channels.iter().cloned())
        .build()?;

        self.store
            .save_message(&StoredMessage {
                id: user_id.clone(),
                conversation_id: inbound.conversation_id.clone(),
                role: Role::User,
                content: inbound.content.clone(),
                audio_url: None,
                channel: inbound.source_channel.clone(),
                created_at: user_note.timestamp(),
                delivery_status: None,
            })
            .await?;

        let user_delivery = BroadcastReport::new(self.router.broadcast_response(&user_note).await);
        let user_status = self.router.get_delivery_status(&user_id).await;
        self.store
            .set_delivery_status(&user_id, &user_status.delivered_field())
            .await?;

        let reply = self
            .generator
            .generate(&inbound.conversation_id, &inbound.content)
            .await?;
        let audio_url = self.synthesize(&reply).await;

        let reply_id = Uuid::new_v4().to_string();
        let reply_note =
            Notification::builder(&reply_id, &inbound.conversation_id, Role::Assistant, &reply)
                .maybe_audio_url(audio_url.clone())
                .source_channel(&inbound.source_channel)
                .target_channels(inbound.target_channels.iter().cloned())
                .build()?;

        self.store
            .save_message(&StoredMessage {
                id: reply_id.clone(),
                conversation_id: inbound.conversation_id.clone(),
                role: Role::Assistant,
                content: reply.clone(),
                audio_url: reply_note.audio_url().map(str::to_string),
                channel: inbound.source_channel.clone(),
                created_at: reply_note.timestamp(),
                delivery_status: None,
            })
            .await?;

        let reply_delivery = BroadcastReport::new(self.router.broadcast_to_all(&reply_note).await);
        let reply_status = self.router.get_delivery_status(&reply_id).await;
        self.store
            .set_delivery_status(&reply_id, &reply_status.delivered_field())
            .await?;

        if !reply_status.is_complete() {
            warn!(
                message_id = %reply_id,
                "Reply pending on: {}",
                reply_status.pending.join(", ")
            );
        }
        info!(
            conversation_id = %inbound.conversation_id,
            "Chat turn complete: user {}, reply {}",
            user_delivery,
            reply_delivery
        );

        Ok(ChatOutcome {
            user_message_id: user_id,
            reply_message_id: reply_id,
            reply,
            audio_url: reply_note.audio_url().map(str::to_string),
            user_delivery,
            reply_delivery,
            reply_status,
        })
    }

    /// Synthesis is best effort: a failure leaves the reply text-only.
    async fn synthesize(&self, text: &str) -> Option<String> {
        let synthesizer = self.synthesizer.as_ref()?;
        match synthesizer.synthesize(text).await {
            Ok(url) => url,
            Err(e) => {
                warn!("Speech synthesis failed, sending text only: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{ChannelHandler, WebChannel};

    struct FixedGenerator(&'static str);

    #[async_trait]
    impl ReplyGenerator for FixedGenerator {
        async fn generate(&self, _conversation_id: &str, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl ReplyGenerator for FailingGenerator {
        async fn generate(&self, _conversation_id: &str, _prompt: &str) -> Result<String> {
            Err(RelayError::Generation("model offline".to_string()))
        }
    }

    struct FixedVoice(Option<&'static str>);

    #[async_trait]
    impl SpeechSynthesizer for FixedVoice {
        async fn synthesize(&self, _text: &str) -> Result<Option<String>> {
            Ok(self.0.map(str::to_string))
        }
    }

    struct BrokenVoice;

    #[async_trait]
    impl SpeechSynthesizer for BrokenVoice {
        async fn synthesize(&self, _text: &str) -> Result<Option<String>> {
            Err(RelayError::Generation("tts quota".to_string()))
        }
    }

    struct Flaky(&'static str, bool);

    #[async_trait]
    impl ChannelHandler for Flaky {
        fn name(&self) -> &str {
            self.0
        }

        fn is_available(&self) -> bool {
            true
        }

        async fn send(&self, _notification: &Notification) -> bool {
            self.1
        }
    }

    async fn router_with(handlers: Vec<Arc<dyn ChannelHandler>>) -> Arc<Router> {
        let router = Arc::new(Router::new());
        for handler in handlers {
            router.register_handler(handler).await;
        }
        router
    }

    #[tokio::test]
    async fn test_turn_persists_and_broadcasts() {
        let router = router_with(vec![
            Arc::new(WebChannel::new()),
            Arc::new(Flaky("discord", true)),
        ])
        .await;
        let store = Arc::new(InMemoryMessageStore::new());
        let orchestrator =
            Orchestrator::new(router, store.clone(), Arc::new(FixedGenerator("Hi!")));

        let outcome = orchestrator
            .handle_inbound(InboundChat::new("conv-1", "hello").with_message_id("u1"))
            .await
            .unwrap();

        assert_eq!(outcome.user_message_id, "u1");
        assert_eq!(outcome.reply, "Hi!");
        // Source "web" is excluded for the user's message.
        assert_eq!(outcome.user_delivery.succeeded(), vec!["discord"]);
        assert_eq!(outcome.reply_delivery.succeeded(), vec!["discord", "web"]);
        assert!(outcome.reply_status.is_complete());

        let reply = store
            .get_message(&outcome.reply_message_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.delivery_status.as_deref(), Some("discord,web"));

        let user = store.get_message("u1").await.unwrap().unwrap();
        assert_eq!(user.delivery_status.as_deref(), Some("discord"));
        assert_eq!(store.conversation("conv-1").await.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_channel_left_out_of_delivery_field() {
        let router = router_with(vec![
            Arc::new(WebChannel::new()),
            Arc::new(Flaky("whatsapp", false)),
        ])
        .await;
        let store = Arc::new(InMemoryMessageStore::new());
        let orchestrator =
            Orchestrator::new(router, store.clone(), Arc::new(FixedGenerator("ok")));

        let outcome = orchestrator
            .handle_inbound(InboundChat::new("conv-1", "hi"))
            .await
            .unwrap();

        assert_eq!(outcome.reply_delivery.failed(), vec!["whatsapp"]);
        assert_eq!(outcome.reply_status.pending, vec!["whatsapp"]);
        let reply = store
            .get_message(&outcome.reply_message_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.delivery_status.as_deref(), Some("web"));
    }

    #[tokio::test]
    async fn test_synthesized_audio_attached() {
        let router = router_with(vec![Arc::new(WebChannel::new())]).await;
        let store = Arc::new(InMemoryMessageStore::new());
        let orchestrator =
            Orchestrator::new(router, store.clone(), Arc::new(FixedGenerator("ok")))
                .with_synthesizer(Arc::new(FixedVoice(Some("https://cdn/a.mp3"))));

        let outcome = orchestrator
            .handle_inbound(InboundChat::new("conv-1", "hi"))
            .await
            .unwrap();

        assert_eq!(outcome.audio_url.as_deref(), Some("https://cdn/a.mp3"));
        let reply = store
            .get_message(&outcome.reply_message_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.audio_url.as_deref(), Some("https://cdn/a.mp3"));
    }

    #[tokio::test]
    async fn test_synthesis_failure_is_not_fatal() {
        let router = router_with(vec![Arc::new(WebChannel::new())]).await;
        let orchestrator = Orchestrator::new(
            router,
            Arc::new(InMemoryMessageStore::new()),
            Arc::new(FixedGenerator("ok")),
        )
        .with_synthesizer(Arc::new(BrokenVoice));

        let outcome = orchestrator
            .handle_inbound(InboundChat::new("conv-1", "hi"))
            .await
            .unwrap();
        assert!(outcome.audio_url.is_none());
        assert!(outcome.reply_delivery.all_succeeded());
    }

    #[tokio::test]
    async fn test_generation_failure_propagates_after_user_broadcast() {
        let router = router_with(vec![Arc::new(Flaky("discord", true))]).await;
        let store = Arc::new(InMemoryMessageStore::new());
        let orchestrator =
            Orchestrator::new(router.clone(), store.clone(), Arc::new(FailingGenerator));

        let err = orchestrator
            .handle_inbound(InboundChat::new("conv-1", "hi").with_message_id("u1"))
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::Generation(_)));
        assert!(store.get_message("u1").await.unwrap().is_some());
        assert_eq!(router.get_delivery_status("u1").await.delivered, vec!["discord"]);
    }

    #[tokio::test]
    async fn test_explicit_targets_restrict_fanout() {
        let router = router_with(vec![
            Arc::new(WebChannel::new()),
            Arc::new(Flaky("discord", true)),
            Arc::new(Flaky("whatsapp", true)),
        ])
        .await;
        let orchestrator = Orchestrator::new(
            router,
            Arc::new(InMemoryMessageStore::new()),
            Arc::new(EchoGenerator),
        );

        let outcome = orchestrator
            .handle_inbound(
                InboundChat::new("conv-1", "hi")
                    .from_channel("whatsapp")
                    .with_targets(vec!["whatsapp".to_string(), "web".to_string()]),
            )
            .await
            .unwrap();

        assert_eq!(outcome.reply, "Echo: hi");
        assert_eq!(outcome.user_delivery.succeeded(), vec!["web"]);
        assert_eq!(outcome.reply_delivery.succeeded(), vec!["web", "whatsapp"]);
        // discord was never targeted but is active, so it reads as pending.
        assert_eq!(outcome.reply_status.pending, vec!["discord"]);
    }

    #[tokio::test]
    async fn test_store_failure_stops_before_broadcast() {
        let router = router_with(vec![Arc::new(Flaky("discord", true))]).await;
        let mut store = MockMessageStore::new();
        store
            .expect_save_message()
            .times(1)
            .returning(|_| Err(RelayError::Store("disk full".to_string())));
        store.expect_set_delivery_status().never();

        let orchestrator =
            Orchestrator::new(router.clone(), Arc::new(store), Arc::new(EchoGenerator));
        let err = orchestrator
            .handle_inbound(InboundChat::new("conv-1", "hi").with_message_id("u1"))
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::Store(_)));
        assert!(router.get_delivery_status("u1").await.delivered.is_empty());
    }

    #[tokio::test]
    async fn test_delivery_written_for_user_message() {
        let router = router_with(vec![Arc::new(Flaky("discord", true))]).await;
        let mut store = MockMessageStore::new();
        store.expect_save_message().times(2).returning(|_| Ok(()));
        store
            .expect_set_delivery_status()
            .withf(|id, delivered| id == "u1" && delivered == "discord")
            .times(1)
            .returning(|_, _| Ok(()));
        store
            .expect_set_delivery_status()
            .withf(|id, delivered| id != "u1" && delivered == "discord")
            .times(1)
            .returning(|_, _| Ok(()));

        let orchestrator = Orchestrator::new(router, Arc::new(store), Arc::new(EchoGenerator));
        orchestrator
            .handle_inbound(InboundChat::new("conv-1", "hi").with_message_id("u1"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_blank_conversation_rejected() {
        let router = router_with(vec![Arc::new(WebChannel::new())]).await;
        let orchestrator = Orchestrator::new(
            router,
            Arc::new(InMemoryMessageStore::new()),
            Arc::new(EchoGenerator),
        );
        let err = orchestrator
            .handle_inbound(InboundChat::new("", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::InvalidNotification(_)));
    }

    #[tokio::test]
    async fn test_in_memory_set_status_unknown_message() {
        let store = InMemoryMessageStore::new();
        let err = store.set_delivery_status("nope", "web").await.unwrap_err();
        assert!(matches!(err, RelayError::NotFound(_)));
    }
}
