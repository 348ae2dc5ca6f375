//! The unforgeable "safe to send" token and the delivery port that
//! requires it.
//!
//! ## Security Notes
//!
//! [`FilteredContent`] has no public constructor, no `Deserialize` impl and
//! no `Default`. The only code path that creates one is a committed
//! `CoercionFilterPipeline::filter` call that accepted the text. Because
//! [`MessageSender::send`] takes a `FilteredContent` rather than a string,
//! unfiltered text cannot reach a participant through this port.

use std::fmt;

use chrono::{DateTime, Utc};
use conclave_ledger::{hex_hash, Hash};
use serde::Serialize;
use thiserror::Error;

/// Text that passed the coercion filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilteredContent {
    content: String,
    #[serde(with = "hex_hash")]
    original_hash: Hash,
    filter_version: String,
    filtered_at: DateTime<Utc>,
}

impl FilteredContent {
    pub(crate) fn new(
        content: String,
        original_hash: Hash,
        filter_version: String,
        filtered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            content,
            original_hash,
            filter_version,
            filtered_at,
        }
    }

    /// The filtered, possibly transformed, text.
    pub fn as_str(&self) -> &str {
        &self.content
    }

    /// BLAKE3 hash of the text as submitted, before transformation.
    pub fn original_hash(&self) -> &Hash {
        &self.original_hash
    }

    pub fn filter_version(&self) -> &str {
        &self.filter_version
    }

    pub fn filtered_at(&self) -> DateTime<Utc> {
        self.filtered_at
    }
}

impl AsRef<str> for FilteredContent {
    fn as_ref(&self) -> &str {
        &self.content
    }
}

impl fmt::Display for FilteredContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

/// Delivery failure reported by a [`MessageSender`].
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Recipient '{0}' is unknown")]
    UnknownRecipient(String),

    #[error("Delivery to '{recipient}' failed: {detail}")]
    Transport { recipient: String, detail: String },
}

/// Port for participant-facing delivery.
pub trait MessageSender: Send + Sync {
    /// Delivers filtered content to `recipient`.
    fn send(&self, recipient: &str, content: &FilteredContent) -> std::result::Result<(), DeliveryError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_ledger::content_hash;

    #[test]
    fn test_accessors_and_display() {
        let content = FilteredContent::new(
            "please review".to_string(),
            content_hash("URGENT please review"),
            "filter-1".to_string(),
            Utc::now(),
        );
        assert_eq!(content.as_str(), "please review");
        assert_eq!(content.to_string(), "please review");
        assert_eq!(content.original_hash(), &content_hash("URGENT please review"));
        assert_eq!(content.filter_version(), "filter-1");
    }

    #[test]
    fn test_serializes_hash_as_hex() {
        let content = FilteredContent::new("x".to_string(), [0xab; 32], "v".to_string(), Utc::now());
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["original_hash"], "ab".repeat(32));
    }
}
