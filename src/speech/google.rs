//! Google Cloud Speech-to-Text (`v1p1beta1`) client

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Transcriber;
use crate::credentials::TokenProvider;
use crate::storage::StoredObject;
use crate::{Error, Result};

const RECOGNIZE_URL: &str = "https://speech.googleapis.com/v1p1beta1/speech:recognize";

/// Fixed recognition settings for uploaded videos
const ENCODING: &str = "MP3";
const SAMPLE_RATE_HERTZ: u32 = 48_000;
const LANGUAGE_CODE: &str = "zh-TW";

#[derive(Debug, Serialize)]
struct RecognizeRequest<'a> {
    config: RecognitionConfig<'a>,
    audio: RecognitionAudio<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig<'a> {
    encoding: &'a str,
    sample_rate_hertz: u32,
    language_code: &'a str,
}

#[derive(Debug, Serialize)]
struct RecognitionAudio<'a> {
    uri: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
    #[serde(default)]
    confidence: f32,
}

impl RecognizeResponse {
    /// Transcripts of every alternative of every result, space separated
    fn transcript(&self) -> String {
        self.results
            .iter()
            .flat_map(|r| r.alternatives.iter())
            .map(|a| a.transcript.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Speech-to-text client
pub struct GoogleSpeechClient {
    client: reqwest::Client,
    tokens: Arc<TokenProvider>,
    project_id: String,
}

impl GoogleSpeechClient {
    #[must_use]
    pub fn new(client: reqwest::Client, tokens: Arc<TokenProvider>, project_id: impl Into<String>) -> Self {
        Self {
            client,
            tokens,
            project_id: project_id.into(),
        }
    }
}

#[async_trait]
impl Transcriber for GoogleSpeechClient {
    async fn transcribe(&self, object: &StoredObject) -> Result<String> {
        let uri = object.gs_uri();
        let token = self.tokens.access_token().await?;

        let request = RecognizeRequest {
            config: RecognitionConfig {
                encoding: ENCODING,
                sample_rate_hertz: SAMPLE_RATE_HERTZ,
                language_code: LANGUAGE_CODE,
            },
            audio: RecognitionAudio { uri: &uri },
        };

        tracing::debug!(uri = %uri, "starting speech recognition");

        let response = self
            .client
            .post(RECOGNIZE_URL)
            .bearer_auth(token)
            .header("x-goog-user-project", &self.project_id)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Transcription(format!("recognize request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Speech API error");
            return Err(Error::Transcription(format!("Speech API error {status}: {body}")));
        }

        let result: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| Error::Transcription(format!("failed to parse recognize response: {e}")))?;

        for alt in result.results.iter().flat_map(|r| r.alternatives.iter()) {
            tracing::debug!(transcript = %alt.transcript, confidence = alt.confidence, "recognized alternative");
        }

        let transcript = result.transcript();
        tracing::info!(uri = %uri, chars = transcript.chars().count(), "transcription complete");
        Ok(transcript)
    }
}
