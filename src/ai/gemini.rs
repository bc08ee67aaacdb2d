//! Gemini REST client

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use super::{Content, GenerateRequest, GenerateResponse, GenerativeBackend};
use crate::{Error, Result};

/// Gemini `generateContent` client
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest<'a> {
    contents: &'a [Content],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

impl GeminiClient {
    /// Create a new client
    ///
    /// `client` should carry the gateway's request timeout.
    #[must_use]
    pub fn new(client: reqwest::Client, api_key: SecretString, base_url: impl Into<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let body = WireRequest {
            contents: &request.contents,
            generation_config: GenerationConfig {
                temperature: request.settings.temperature,
            },
        };

        tracing::debug!(
            model = %request.settings.model,
            contents = request.contents.len(),
            "sending Gemini request"
        );

        let response = self
            .client
            .post(self.endpoint(&request.settings.model))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Ai(format!("Gemini request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Gemini API error");
            return Err(Error::Ai(format!("Gemini API error {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Ai(format!("failed to parse Gemini response: {e}")))
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{ModelSettings, Part};

    #[test]
    fn endpoint_includes_model() {
        let client = GeminiClient::new(
            reqwest::Client::new(),
            SecretString::from("key".to_string()),
            "https://generativelanguage.googleapis.com/",
        );

        assert_eq!(
            client.endpoint("gemini-1.5-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn wire_request_shape() {
        let request = GenerateRequest {
            settings: ModelSettings::chat("m"),
            contents: vec![Content::user_text("hello")],
        };
        let body = WireRequest {
            contents: &request.contents,
            generation_config: GenerationConfig {
                temperature: request.settings.temperature,
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0], serde_json::to_value(Part::text("hello")).unwrap());
        assert!((json["generationConfig"]["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }
}
