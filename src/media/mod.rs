//! Video transcription pipeline
//!
//! A [`MediaJob`] is created for every video message. [`MediaPipeline::run`]
//! downloads the video, stores it, transcribes it and pushes a result bubble
//! to the originating conversation. No step retries; every run ends with a
//! delivery attempt, and the [`JobReport`] records what happened.

pub mod queue;

use std::sync::Arc;

use uuid::Uuid;

use crate::channels::line::Source;
use crate::channels::line::flex::video_result_message;
use crate::channels::{Messenger, OutgoingMessage};
use crate::speech::Transcriber;
use crate::storage::{MediaKind, ObjectNamer, ObjectStorage, StoredObject};

pub use queue::{JobHandle, MediaQueue};

/// Prefix of the message pushed when the video cannot be stored
pub const UPLOAD_FAILED_PREFIX: &str = "影片上傳失敗：";

/// Text pushed when no speech was recognized
pub const FALLBACK_TEXT: &str = "無法辨識影片內容文字，請重新輸入。";

/// One video to process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaJob {
    pub id: Uuid,
    /// LINE message id of the video
    pub message_id: String,
    pub kind: MediaKind,
    /// Conversation the result is pushed to
    pub target: String,
}

impl MediaJob {
    /// Job for a message from `source`; `None` when the source has no
    /// conversation to push to
    #[must_use]
    pub fn for_event(message_id: impl Into<String>, kind: MediaKind, source: &Source) -> Option<Self> {
        let target = source.push_target()?;
        Some(Self {
            id: Uuid::new_v4(),
            message_id: message_id.into(),
            kind,
            target: target.to_string(),
        })
    }
}

/// Outcome of one pipeline run
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job_id: Uuid,
    pub message_id: String,
    pub target: String,
    /// Stored object, when the upload succeeded
    pub object: Option<StoredObject>,
    /// Raw transcript (empty when nothing was recognized or transcription failed)
    pub transcript: String,
    /// Text delivered to the user
    pub message_text: String,
    /// Whether the push was accepted
    pub delivered: bool,
    /// Failures encountered along the way, in order
    pub failures: Vec<String>,
}

impl JobReport {
    fn new(job: &MediaJob) -> Self {
        Self {
            job_id: job.id,
            message_id: job.message_id.clone(),
            target: job.target.clone(),
            object: None,
            transcript: String::new(),
            message_text: String::new(),
            delivered: false,
            failures: Vec::new(),
        }
    }
}

/// Download, store, transcribe and deliver
pub struct MediaPipeline {
    messenger: Arc<dyn Messenger>,
    storage: Arc<dyn ObjectStorage>,
    transcriber: Arc<dyn Transcriber>,
    namer: ObjectNamer,
}

impl MediaPipeline {
    #[must_use]
    pub fn new(
        messenger: Arc<dyn Messenger>,
        storage: Arc<dyn ObjectStorage>,
        transcriber: Arc<dyn Transcriber>,
        namer: ObjectNamer,
    ) -> Self {
        Self {
            messenger,
            storage,
            transcriber,
            namer,
        }
    }

    /// Process `job` to completion
    pub async fn run(&self, job: &MediaJob) -> JobReport {
        let mut report = JobReport::new(job);
        tracing::info!(job = %job.id, message_id = %job.message_id, target = %job.target, "media job started");

        let content = match self.messenger.fetch_content(&job.message_id).await {
            Ok(bytes) if bytes.is_empty() => {
                report.failures.push("content is empty".to_string());
                None
            }
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(job = %job.id, error = %e, "failed to fetch media content");
                report.failures.push(e.to_string());
                None
            }
        };

        let message = match self.store(job, content, &mut report).await {
            Some(object) => {
                let transcript = self.transcribe(job, &object, &mut report).await;
                let text = if transcript.is_empty() {
                    FALLBACK_TEXT.to_string()
                } else {
                    transcript.clone()
                };

                let message = video_result_message(&object.public_url(), &text);
                report.transcript = transcript;
                report.message_text = text;
                report.object = Some(object);
                message
            }
            None => {
                let reason = report
                    .failures
                    .last()
                    .cloned()
                    .unwrap_or_else(|| "no content".to_string());
                let text = format!("{UPLOAD_FAILED_PREFIX}{reason}");
                report.message_text.clone_from(&text);
                OutgoingMessage::text(text)
            }
        };

        match self.messenger.push(&job.target, vec![message]).await {
            Ok(()) => report.delivered = true,
            Err(e) => {
                tracing::error!(job = %job.id, target = %job.target, error = %e, "failed to push media result");
                report.failures.push(e.to_string());
            }
        }

        tracing::info!(
            job = %job.id,
            delivered = report.delivered,
            failures = report.failures.len(),
            "media job finished"
        );
        report
    }

    async fn store(
        &self,
        job: &MediaJob,
        content: Option<Vec<u8>>,
        report: &mut JobReport,
    ) -> Option<StoredObject> {
        let bytes = content?;
        let key = self.namer.next_key(job.kind);

        match self.storage.upload(&key, bytes, job.kind.mime_type()).await {
            Ok(object) => {
                tracing::debug!(job = %job.id, key = %object.key, "media stored");
                Some(object)
            }
            Err(e) => {
                tracing::warn!(job = %job.id, key = %key, error = %e, "media upload failed");
                report.failures.push(e.to_string());
                None
            }
        }
    }

    /// Transcript of `object`; failures are recorded and read as empty
    async fn transcribe(&self, job: &MediaJob, object: &StoredObject, report: &mut JobReport) -> String {
        match self.transcriber.transcribe(object).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!(job = %job.id, error = %e, "transcription failed");
                report.failures.push(e.to_string());
                String::new()
            }
        }
    }
}
