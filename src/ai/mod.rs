//! Generative AI backend and chat sessions
//!
//! A [`ChatSession`] owns the turn history of one conversation. The history
//! is sent in full with every turn, so the backend itself stays stateless.

pub mod gemini;
pub mod vision;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{Error, Result};

pub use gemini::GeminiClient;
pub use vision::ImageDescriber;

/// Sampling temperature for conversational sessions
pub const CHAT_TEMPERATURE: f32 = 0.3;

/// Sampling temperature for one-shot image descriptions
pub const VISION_TEMPERATURE: f32 = 0.8;

/// Shared handle to a live chat session
pub type SessionHandle = Arc<ChatSession>;

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One turn of content (a prompt or a candidate reply)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    /// A user turn holding plain text
    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Some(Role::User),
            parts: vec![Part::text(text)],
        }
    }

    /// Concatenated text of all parts
    #[must_use]
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(|p| p.text.as_deref()).collect()
    }
}

/// A piece of content: text or inline binary data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
}

impl Part {
    /// Text part
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    /// Inline binary part (base64-encodes `data`)
    #[must_use]
    pub fn inline(mime_type: impl Into<String>, data: &[u8]) -> Self {
        use base64::Engine as _;

        Self {
            text: None,
            inline_data: Some(Blob {
                mime_type: mime_type.into(),
                data: base64::engine::general_purpose::STANDARD.encode(data),
            }),
        }
    }
}

/// Base64-encoded inline data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

/// Model selection and sampling fixed at session creation
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
}

impl ModelSettings {
    /// Conversational mode
    #[must_use]
    pub fn chat(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: CHAT_TEMPERATURE,
        }
    }

    /// Image-description mode
    #[must_use]
    pub fn vision(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: VISION_TEMPERATURE,
        }
    }
}

/// A single generation request
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub settings: ModelSettings,
    pub contents: Vec<Content>,
}

/// Candidate replies from the backend
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl GenerateResponse {
    /// All text parts of all candidates, in response order, no separator
    #[must_use]
    pub fn text(&self) -> String {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .map(Content::text)
            .collect()
    }

    /// Response with one text candidate
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(Content {
                    role: Some(Role::Model),
                    parts: vec![Part::text(text)],
                }),
                finish_reason: Some("STOP".to_string()),
            }],
        }
    }

    fn finish_reason(&self) -> &str {
        self.candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
            .unwrap_or("none")
    }
}

/// Remote generative AI service
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Run one generation request
    ///
    /// # Errors
    ///
    /// Returns `Error::Ai` (or `Error::Http`) if the call fails
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// One multi-turn conversation
///
/// Turns are serialized by the history lock, which is held across the
/// backend call.
#[derive(Debug)]
pub struct ChatSession {
    id: Uuid,
    settings: ModelSettings,
    history: Mutex<Vec<Content>>,
}

impl ChatSession {
    /// Start an empty session
    #[must_use]
    pub fn new(settings: ModelSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            settings,
            history: Mutex::new(Vec::new()),
        }
    }

    /// Unique session identity
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub const fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    /// Number of recorded contents (two per completed turn)
    pub async fn history_len(&self) -> usize {
        self.history.lock().await.len()
    }

    /// Send the next user turn and wait for the reply
    ///
    /// History only grows when the backend call succeeds.
    ///
    /// # Errors
    ///
    /// Returns the backend error unchanged, or `Error::Ai` when the reply
    /// contains no text
    pub async fn send(&self, backend: &dyn GenerativeBackend, text: &str) -> Result<String> {
        let mut history = self.history.lock().await;

        let user_turn = Content::user_text(text);
        let mut contents = history.clone();
        contents.push(user_turn.clone());

        let response = backend
            .generate(GenerateRequest {
                settings: self.settings.clone(),
                contents,
            })
            .await?;

        let reply = response.text();
        if reply.is_empty() {
            return Err(Error::Ai(format!(
                "{} returned no text (finish reason: {})",
                backend.name(),
                response.finish_reason()
            )));
        }

        let model_turn = response
            .candidates
            .into_iter()
            .find_map(|c| c.content)
            .map_or_else(
                || Content {
                    role: Some(Role::Model),
                    parts: vec![Part::text(reply.clone())],
                },
                |mut content| {
                    content.role = Some(Role::Model);
                    content
                },
            );

        history.push(user_turn);
        history.push(model_turn);

        tracing::debug!(session = %self.id, turns = history.len() / 2, "chat turn complete");
        Ok(reply)
    }
}
