//! In-memory delivery ledger.
//!
//! Maps a message id to the set of channel names that confirmed delivery.
//! Entries are created lazily on the first successful delivery and are never
//! evicted, so memory grows with the number of distinct message ids ever
//! broadcast by this process.

use std::collections::{BTreeSet, HashMap};

use tokio::sync::RwLock;

/// Per-message record of confirmed channel deliveries.
#[derive(Debug, Default)]
pub struct DeliveryLedger {
    entries: RwLock<HashMap<String, BTreeSet<String>>>,
}

impl DeliveryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `channel` accepted `message_id`.
    ///
    /// Insertion is idempotent, so concurrent broadcasts of the same message
    /// accumulate into one set.
    pub async fn record(&self, message_id: &str, channel: &str) {
        let mut entries = self.entries.write().await;
        entries
            .entry(message_id.to_string())
            .or_default()
            .insert(channel.to_string());
    }

    /// Replaces the entry for `message_id` with exactly `channels`.
    pub async fn replace<I>(&self, message_id: &str, channels: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut entries = self.entries.write().await;
        entries.insert(message_id.to_string(), channels.into_iter().collect());
    }

    /// Channels that confirmed `message_id`, sorted by name. Empty if none.
    pub async fn delivered(&self, message_id: &str) -> Vec<String> {
        let entries = self.entries.read().await;
        entries
            .get(message_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn contains(&self, message_id: &str, channel: &str) -> bool {
        let entries = self.entries.read().await;
        entries
            .get(message_id)
            .is_some_and(|set| set.contains(channel))
    }

    /// Number of message ids with an entry.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
