//! Delivery status and broadcast aggregation helpers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Snapshot of where a message has and has not been confirmed.
///
/// `pending` is computed against the channels active *at query time*, not
/// against the channels targeted when the message was broadcast. A channel
/// that was never a target can show up as pending, and a target that has
/// since gone inactive drops out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryStatus {
    pub delivered: Vec<String>,
    pub pending: Vec<String>,
}

impl DeliveryStatus {
    /// True when no active channel is still waiting.
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }

    /// Comma-joined `delivered` list, suitable for a single string column.
    pub fn delivered_field(&self) -> String {
        self.delivered.join(",")
    }
}

/// Per-channel outcome of one broadcast call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    results: HashMap<String, bool>,
}

impl BroadcastReport {
    pub fn new(results: HashMap<String, bool>) -> Self {
        Self { results }
    }

    /// Channels that accepted the message, sorted.
    pub fn succeeded(&self) -> Vec<String> {
        self.filtered(true)
    }

    /// Channels that were targeted but did not accept, sorted.
    pub fn failed(&self) -> Vec<String> {
        self.filtered(false)
    }

    /// True if every targeted channel accepted. Vacuously true when nothing
    /// was targeted.
    pub fn all_succeeded(&self) -> bool {
        self.results.values().all(|ok| *ok)
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn get(&self, channel: &str) -> Option<bool> {
        self.results.get(channel).copied()
    }

    pub fn results(&self) -> &HashMap<String, bool> {
        &self.results
    }

    fn filtered(&self, want: bool) -> Vec<String> {
        let mut names: Vec<String> = self
            .results
            .iter()
            .filter(|(_, ok)| **ok == want)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

impl From<HashMap<String, bool>> for BroadcastReport {
    fn from(results: HashMap<String, bool>) -> Self {
        Self::new(results)
    }
}

impl fmt::Display for BroadcastReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} channels delivered",
            self.succeeded().len(),
            self.len()
        )?;
        let failed = self.failed();
        if !failed.is_empty() {
            write!(f, " (failed: {})", failed.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(pairs: &[(&str, bool)]) -> BroadcastReport {
        pairs
            .iter()
            .map(|(name, ok)| (name.to_string(), *ok))
            .collect::<HashMap<_, _>>()
            .into()
    }

    #[test]
    fn test_status_complete() {
        let status = DeliveryStatus {
            delivered: vec!["web".into()],
            pending: vec![],
        };
        assert!(status.is_complete());
        assert_eq!(status.delivered_field(), "web");
    }

    #[test]
    fn test_status_delivered_field_joins() {
        let status = DeliveryStatus {
            delivered: vec!["discord".into(), "web".into()],
            pending: vec!["whatsapp".into()],
        };
        assert!(!status.is_complete());
        assert_eq!(status.delivered_field(), "discord,web");
    }

    #[test]
    fn test_report_partitions() {
        let r = report(&[("web", true), ("discord", false), ("whatsapp", true)]);
        assert_eq!(r.succeeded(), vec!["web", "whatsapp"]);
        assert_eq!(r.failed(), vec!["discord"]);
        assert!(!r.all_succeeded());
        assert_eq!(r.get("discord"), Some(false));
        assert_eq!(r.get("slack"), None);
    }

    #[test]
    fn test_empty_report_all_succeeded() {
        let r = BroadcastReport::default();
        assert!(r.is_empty());
        assert!(r.all_succeeded());
        assert_eq!(r.to_string(), "0/0 channels delivered");
    }

    #[test]
    fn test_report_display() {
        let r = report(&[("a", true), ("b", false), ("c", true)]);
        assert_eq!(r.to_string(), "2/3 channels delivered (failed: b)");
    }
}
