//! Messaging channel adapters
//!
//! The gateway talks to its messaging platform through [`Messenger`]: reply
//! to an inbound event, push to a conversation later, and download message
//! content. LINE is the only implementation.

pub mod line;

use async_trait::async_trait;
use serde::Serialize;

pub use line::LineChannel;

use crate::Result;

/// Message sent to the platform
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutgoingMessage {
    /// Plain text
    Text { text: String },
    /// Flex message (structured bubble)
    #[serde(rename_all = "camelCase")]
    Flex {
        alt_text: String,
        contents: serde_json::Value,
    },
}

impl OutgoingMessage {
    /// Plain text message
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Text shown in notifications and by clients without rich rendering
    #[must_use]
    pub fn preview(&self) -> &str {
        match self {
            Self::Text { text } => text,
            Self::Flex { alt_text, .. } => alt_text,
        }
    }
}

/// Outbound operations on the messaging platform
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Answer an inbound event; a reply token is valid for one use
    ///
    /// # Errors
    ///
    /// Returns `Error::Channel` if the platform rejects the reply
    async fn reply(&self, reply_token: &str, messages: Vec<OutgoingMessage>) -> Result<()>;

    /// Send to a user, group or room id at any time
    ///
    /// # Errors
    ///
    /// Returns `Error::Channel` if the platform rejects the push
    async fn push(&self, to: &str, messages: Vec<OutgoingMessage>) -> Result<()>;

    /// Download the binary content of a received message
    ///
    /// # Errors
    ///
    /// Returns `Error::Channel` if the content cannot be fetched
    async fn fetch_content(&self, message_id: &str) -> Result<Vec<u8>>;

    /// Channel name for logging
    fn name(&self) -> &'static str;
}
