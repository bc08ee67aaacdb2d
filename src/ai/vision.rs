//! One-shot image description
//!
//! Unlike chat sessions, each description is an independent request at the
//! higher vision temperature.

use std::sync::Arc;

use super::{Content, GenerateRequest, GenerativeBackend, ModelSettings, Part, Role};
use crate::{Error, Result};

/// Instruction sent with every image; language and format are set here
const DESCRIBE_PROMPT: &str =
    "請用繁體中文詳細描述這張圖片的內容，包含主要物件、場景以及圖片中可見的文字。";

/// Describes images with a generative backend
pub struct ImageDescriber {
    backend: Arc<dyn GenerativeBackend>,
    settings: ModelSettings,
}

impl ImageDescriber {
    #[must_use]
    pub fn new(backend: Arc<dyn GenerativeBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            settings: ModelSettings::vision(model),
        }
    }

    /// Describe an image
    ///
    /// # Errors
    ///
    /// Returns error if the backend call fails or yields no text
    pub async fn describe(&self, image: &[u8], mime_type: &str) -> Result<String> {
        let request = GenerateRequest {
            settings: self.settings.clone(),
            contents: vec![Content {
                role: Some(Role::User),
                parts: vec![Part::inline(normalize_mime_type(mime_type), image), Part::text(DESCRIBE_PROMPT)],
            }],
        };

        let description = self.backend.generate(request).await?.text();
        if description.is_empty() {
            return Err(Error::Ai("empty response from vision model".to_string()));
        }

        tracing::debug!(chars = description.chars().count(), "image described");
        Ok(description)
    }
}

/// Normalize MIME type for the inline data part
fn normalize_mime_type(mime_type: &str) -> &'static str {
    match mime_type.to_lowercase().as_str() {
        "image/png" => "image/png",
        "image/webp" => "image/webp",
        "image/heic" => "image/heic",
        // jpeg, jpg, and any unknown type default to jpeg
        _ => "image/jpeg",
    }
}
