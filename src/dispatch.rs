//! Inbound event dispatch
//!
//! Routes each event of a verified callback to the handler for its message
//! type and sends the synchronous reply. Events of one delivery are handled
//! in order.

use std::sync::{Arc, Mutex, PoisonError};

use crate::ai::ImageDescriber;
use crate::channels::line::{CallbackRequest, Event, EventDedup, EventMessage};
use crate::channels::{Messenger, OutgoingMessage};
use crate::conversation::ConversationManager;
use crate::media::{JobHandle, MediaJob, MediaQueue};
use crate::storage::MediaKind;

/// Immediate reply to a video message
pub const VIDEO_PLACEHOLDER: &str = "影片上傳判斷中，請稍候";

/// Prefix of the reply when an image cannot be described
pub const IMAGE_ERROR_PREFIX: &str = "無法辨識圖片內容，請重新輸入：";

/// Prefix of the reply when a video cannot be queued
pub const VIDEO_ERROR_PREFIX: &str = "影片處理失敗：";

/// Content type assumed for LINE image downloads
const IMAGE_MIME_TYPE: &str = "image/jpeg";

/// What happened to an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// A handler ran
    Handled,
    /// Not a message event, or an unsupported message type
    Ignored,
    /// Redelivery of an event already handled
    Duplicate,
}

/// Per-event record of a dispatched callback
#[derive(Debug)]
pub struct EventOutcome {
    pub webhook_event_id: Option<String>,
    pub disposition: Disposition,
    /// Text of the synchronous reply, if one was composed
    pub reply_text: Option<String>,
    /// Whether the platform accepted the reply
    pub replied: bool,
    /// Background job for video messages
    pub job: Option<JobHandle>,
}

impl EventOutcome {
    fn new(event: &Event, disposition: Disposition) -> Self {
        Self {
            webhook_event_id: event.webhook_event_id.clone(),
            disposition,
            reply_text: None,
            replied: false,
            job: None,
        }
    }
}

/// Routes webhook events to their handlers
pub struct Dispatcher {
    messenger: Arc<dyn Messenger>,
    conversations: Arc<ConversationManager>,
    describer: Arc<ImageDescriber>,
    media_queue: MediaQueue,
    dedup: Mutex<EventDedup>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        messenger: Arc<dyn Messenger>,
        conversations: Arc<ConversationManager>,
        describer: Arc<ImageDescriber>,
        media_queue: MediaQueue,
    ) -> Self {
        Self {
            messenger,
            conversations,
            describer,
            media_queue,
            dedup: Mutex::new(EventDedup::default()),
        }
    }

    /// Handle every event of a callback, in order
    pub async fn handle_callback(&self, request: CallbackRequest) -> Vec<EventOutcome> {
        tracing::debug!(
            destination = %request.destination,
            events = request.events.len(),
            "dispatching callback"
        );

        let mut outcomes = Vec::with_capacity(request.events.len());
        for event in &request.events {
            outcomes.push(self.handle_event(event).await);
        }
        outcomes
    }

    fn is_duplicate(&self, event: &Event) -> bool {
        let Some(id) = event.webhook_event_id.as_deref() else {
            return false;
        };

        let mut dedup = self.dedup.lock().unwrap_or_else(PoisonError::into_inner);
        let seen = dedup.is_duplicate(id);
        // Only retries are dropped; a first delivery is always handled
        seen && event.is_redelivery()
    }

    async fn handle_event(&self, event: &Event) -> EventOutcome {
        if self.is_duplicate(event) {
            tracing::info!(event_id = ?event.webhook_event_id, "skipping redelivered event");
            return EventOutcome::new(event, Disposition::Duplicate);
        }

        let Some(message) = event.message.as_ref().filter(|_| event.is_message()) else {
            tracing::debug!(kind = %event.kind, "ignoring non-message event");
            return EventOutcome::new(event, Disposition::Ignored);
        };

        tracing::info!(
            kind = message.kind(),
            user = ?event.source.user_id,
            "message received"
        );

        let mut outcome = EventOutcome::new(event, Disposition::Handled);
        let reply = match message {
            EventMessage::Text { text, .. } => Some(self.handle_text(event, text).await),
            EventMessage::Image { id } => Some(self.handle_image(id).await),
            EventMessage::Sticker {
                package_id,
                sticker_id,
                keywords,
                text,
                ..
            } => Some(sticker_reply(sticker_id, package_id, keywords, text.as_deref())),
            EventMessage::Video { id, .. } => {
                let (reply, job) = self.handle_video(event, id);
                outcome.job = job;
                Some(reply)
            }
            EventMessage::Unknown => {
                tracing::debug!("unsupported message type, no reply");
                outcome.disposition = Disposition::Ignored;
                None
            }
        };

        if let Some(text) = reply {
            outcome.replied = self.reply(event, &text).await;
            outcome.reply_text = Some(text);
        }
        outcome
    }

    async fn handle_text(&self, event: &Event, text: &str) -> String {
        let Some(key) = event.source.session_key() else {
            tracing::warn!(source = %event.source.kind, "text message without a source id");
            return format!("{}missing source id", crate::conversation::APOLOGY_PREFIX);
        };
        self.conversations.respond(key, text).await
    }

    async fn handle_image(&self, message_id: &str) -> String {
        let image = match self.messenger.fetch_content(message_id).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(message_id, error = %e, "failed to fetch image");
                return format!("{IMAGE_ERROR_PREFIX}{e}");
            }
        };

        match self.describer.describe(&image, IMAGE_MIME_TYPE).await {
            Ok(description) => description,
            Err(e) => {
                tracing::warn!(message_id, error = %e, "image description failed");
                format!("{IMAGE_ERROR_PREFIX}{e}")
            }
        }
    }

    fn handle_video(&self, event: &Event, message_id: &str) -> (String, Option<JobHandle>) {
        let Some(job) = MediaJob::for_event(message_id, MediaKind::Video, &event.source) else {
            tracing::warn!(message_id, "video message without a push target");
            return (format!("{VIDEO_ERROR_PREFIX}no conversation to deliver the result to"), None);
        };

        match self.media_queue.submit(job) {
            Ok(handle) => (VIDEO_PLACEHOLDER.to_string(), Some(handle)),
            Err(e) => {
                tracing::error!(message_id, error = %e, "failed to queue video");
                (format!("{VIDEO_ERROR_PREFIX}{e}"), None)
            }
        }
    }

    async fn reply(&self, event: &Event, text: &str) -> bool {
        let Some(token) = event.reply_token.as_deref() else {
            tracing::warn!("event has no reply token, dropping reply");
            return false;
        };

        match self.messenger.reply(token, vec![OutgoingMessage::text(text)]).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(channel = self.messenger.name(), error = %e, "failed to send reply");
                false
            }
        }
    }
}

/// Canned reply describing a sticker
#[must_use]
pub fn sticker_reply(sticker_id: &str, package_id: &str, keywords: &[String], text: Option<&str>) -> String {
    let kw: String = keywords.iter().map(|k| format!(",{k}")).collect();
    format!(
        "收到貼圖訊息: {sticker_id}, pkg: {package_id} kw: {kw}  text: {}",
        text.unwrap_or_default()
    )
}
