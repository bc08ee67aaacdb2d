//! LINE Messaging API channel
//!
//! Reply and push go to `api.line.me`; message content downloads come from
//! `api-data.line.me`. Every call carries the channel access token.

pub mod dedup;
pub mod flex;
pub mod signature;
pub mod types;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use super::{Messenger, OutgoingMessage};
use crate::{Error, Result};

pub use dedup::EventDedup;
pub use types::{CallbackRequest, Event, EventMessage, Source};

/// Messaging API base URL
const API_BASE: &str = "https://api.line.me";

/// Content download base URL
const DATA_API_BASE: &str = "https://api-data.line.me";

/// Messages accepted per reply or push call
const MAX_MESSAGES_PER_CALL: usize = 5;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: &'a [OutgoingMessage],
}

#[derive(Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: &'a [OutgoingMessage],
}

/// LINE channel adapter
pub struct LineChannel {
    client: Client,
    access_token: SecretString,
    api_base: String,
    data_api_base: String,
}

impl LineChannel {
    /// Create an adapter using the given HTTP client
    #[must_use]
    pub fn new(client: Client, access_token: SecretString) -> Self {
        Self {
            client,
            access_token,
            api_base: API_BASE.to_string(),
            data_api_base: DATA_API_BASE.to_string(),
        }
    }

    /// Point the adapter at different API hosts
    #[must_use]
    pub fn with_base_urls(mut self, api_base: &str, data_api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self.data_api_base = data_api_base.trim_end_matches('/').to_string();
        self
    }

    async fn post_json<T: Serialize + Sync>(&self, path: &str, body: &T) -> Result<()> {
        let url = format!("{}{path}", self.api_base);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.access_token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Channel(format!("LINE API error: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Channel(format!("LINE API error ({path}): {status} - {body}")));
        }

        Ok(())
    }
}

fn check_batch(messages: &[OutgoingMessage]) -> Result<()> {
    if messages.is_empty() || messages.len() > MAX_MESSAGES_PER_CALL {
        return Err(Error::Channel(format!(
            "LINE accepts 1 to {MAX_MESSAGES_PER_CALL} messages per call, got {}",
            messages.len()
        )));
    }
    Ok(())
}

#[async_trait]
impl Messenger for LineChannel {
    async fn reply(&self, reply_token: &str, messages: Vec<OutgoingMessage>) -> Result<()> {
        check_batch(&messages)?;
        self.post_json(
            "/v2/bot/message/reply",
            &ReplyRequest {
                reply_token,
                messages: &messages,
            },
        )
        .await?;

        tracing::debug!(count = messages.len(), "LINE reply sent");
        Ok(())
    }

    async fn push(&self, to: &str, messages: Vec<OutgoingMessage>) -> Result<()> {
        check_batch(&messages)?;
        self.post_json(
            "/v2/bot/message/push",
            &PushRequest {
                to,
                messages: &messages,
            },
        )
        .await?;

        tracing::debug!(to, count = messages.len(), "LINE push sent");
        Ok(())
    }

    async fn fetch_content(&self, message_id: &str) -> Result<Vec<u8>> {
        let url = format!("{}/v2/bot/message/{message_id}/content", self.data_api_base);

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| Error::Channel(format!("LINE content error: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Channel(format!(
                "LINE content error for message {message_id}: {status} - {body}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Channel(format!("LINE content read error: {e}")))?;

        tracing::debug!(message_id, size = bytes.len(), "LINE content downloaded");
        Ok(bytes.to_vec())
    }

    fn name(&self) -> &'static str {
        "line"
    }
}
