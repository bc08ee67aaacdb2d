//! Shared test utilities: in-memory service doubles and a router harness

#![allow(dead_code)]

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::Request;
use secrecy::SecretString;

use line_gemini_gateway::ai::{GenerateRequest, GenerateResponse, GenerativeBackend, ImageDescriber, ModelSettings};
use line_gemini_gateway::api::{self, ApiState};
use line_gemini_gateway::channels::line::signature;
use line_gemini_gateway::channels::{Messenger, OutgoingMessage};
use line_gemini_gateway::config::MediaConfig;
use line_gemini_gateway::media::{MediaPipeline, MediaQueue};
use line_gemini_gateway::speech::Transcriber;
use line_gemini_gateway::storage::{ObjectNamer, ObjectStorage, StoredObject};
use line_gemini_gateway::{ConversationManager, Dispatcher, Error, Result, SessionStore};

pub const CHANNEL_SECRET: &str = "test-channel-secret";
pub const BUCKET: &str = "test-bucket";

/// Messenger that records every call
#[derive(Default)]
pub struct MockMessenger {
    pub replies: Mutex<Vec<(String, Vec<OutgoingMessage>)>>,
    pub pushes: Mutex<Vec<(String, Vec<OutgoingMessage>)>>,
    pub content: Mutex<HashMap<String, Vec<u8>>>,
    pub fail_fetch: bool,
}

impl MockMessenger {
    /// Make `message_id` downloadable
    pub fn set_content(&self, message_id: &str, data: &[u8]) {
        self.content
            .lock()
            .unwrap()
            .insert(message_id.to_string(), data.to_vec());
    }

    pub fn replies(&self) -> Vec<(String, Vec<OutgoingMessage>)> {
        self.replies.lock().unwrap().clone()
    }

    pub fn pushes(&self) -> Vec<(String, Vec<OutgoingMessage>)> {
        self.pushes.lock().unwrap().clone()
    }

    /// Poll until `count` pushes were recorded or `timeout` elapses
    pub async fn wait_for_pushes(&self, count: usize, timeout: Duration) -> Vec<(String, Vec<OutgoingMessage>)> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let pushes = self.pushes();
            if pushes.len() >= count || tokio::time::Instant::now() >= deadline {
                return pushes;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    async fn reply(&self, reply_token: &str, messages: Vec<OutgoingMessage>) -> Result<()> {
        self.replies
            .lock()
            .unwrap()
            .push((reply_token.to_string(), messages));
        Ok(())
    }

    async fn push(&self, to: &str, messages: Vec<OutgoingMessage>) -> Result<()> {
        self.pushes.lock().unwrap().push((to.to_string(), messages));
        Ok(())
    }

    async fn fetch_content(&self, message_id: &str) -> Result<Vec<u8>> {
        if self.fail_fetch {
            return Err(Error::Channel(format!("content for {message_id} unavailable")));
        }
        Ok(self
            .content
            .lock()
            .unwrap()
            .get(message_id)
            .cloned()
            .unwrap_or_else(|| b"fake-media-bytes".to_vec()))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Backend answering every request with a fixed reply
pub struct MockBackend {
    reply: String,
    pub requests: Mutex<Vec<GenerateRequest>>,
    pub delay: Duration,
}

impl MockBackend {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            requests: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerativeBackend for MockBackend {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        self.requests.lock().unwrap().push(request);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(GenerateResponse::from_text(self.reply.clone()))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Storage that keeps uploads in memory
#[derive(Default)]
pub struct MockStorage {
    pub uploads: Mutex<Vec<(String, usize, String)>>,
    pub fail: bool,
}

#[async_trait]
impl ObjectStorage for MockStorage {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<StoredObject> {
        if self.fail {
            return Err(Error::Storage("bucket unavailable".to_string()));
        }
        self.uploads
            .lock()
            .unwrap()
            .push((key.to_string(), data.len(), content_type.to_string()));
        Ok(StoredObject {
            bucket: BUCKET.to_string(),
            key: key.to_string(),
        })
    }
}

/// Transcriber returning a fixed transcript
#[derive(Default)]
pub struct MockTranscriber {
    pub transcript: String,
    pub fail: bool,
    /// Never finish, holding the job's worker slot
    pub stall: bool,
    pub requests: Mutex<Vec<String>>,
}

impl MockTranscriber {
    pub fn returning(transcript: &str) -> Self {
        Self {
            transcript: transcript.to_string(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, object: &StoredObject) -> Result<String> {
        self.requests.lock().unwrap().push(object.gs_uri());
        if self.stall {
            std::future::pending::<()>().await;
        }
        if self.fail {
            return Err(Error::Transcription("recognizer unavailable".to_string()));
        }
        Ok(self.transcript.clone())
    }
}

/// Router wired to service doubles
pub struct Harness {
    pub router: Router,
    pub dispatcher: Arc<Dispatcher>,
    pub messenger: Arc<MockMessenger>,
    pub backend: Arc<MockBackend>,
    pub storage: Arc<MockStorage>,
    pub transcriber: Arc<MockTranscriber>,
    pub sessions: Arc<SessionStore>,
}

impl Harness {
    /// Harness whose AI replies `reply` and whose transcriber returns nothing
    pub fn new(reply: &str) -> Self {
        Self::with_services(
            MockMessenger::default(),
            MockBackend::replying(reply),
            MockStorage::default(),
            MockTranscriber::default(),
        )
    }

    pub fn with_services(
        messenger: MockMessenger,
        backend: MockBackend,
        storage: MockStorage,
        transcriber: MockTranscriber,
    ) -> Self {
        Self::with_media_config(messenger, backend, storage, transcriber, &MediaConfig::default())
    }

    pub fn with_media_config(
        messenger: MockMessenger,
        backend: MockBackend,
        storage: MockStorage,
        transcriber: MockTranscriber,
        media: &MediaConfig,
    ) -> Self {
        let messenger = Arc::new(messenger);
        let backend = Arc::new(backend);
        let storage = Arc::new(storage);
        let transcriber = Arc::new(transcriber);

        let sessions = Arc::new(SessionStore::new(NonZeroUsize::new(100).unwrap(), None));
        let conversations = Arc::new(ConversationManager::new(
            Arc::clone(&sessions),
            backend.clone(),
            ModelSettings::chat("test-model"),
        ));
        let describer = Arc::new(ImageDescriber::new(backend.clone(), "test-vision"));
        let pipeline = Arc::new(MediaPipeline::new(
            messenger.clone(),
            storage.clone(),
            transcriber.clone(),
            ObjectNamer::new("test-files/"),
        ));
        let queue = MediaQueue::start(pipeline, media);
        let dispatcher = Arc::new(Dispatcher::new(messenger.clone(), conversations, describer, queue));

        let router = api::router(Arc::new(ApiState {
            dispatcher: Arc::clone(&dispatcher),
            channel_secret: SecretString::from(CHANNEL_SECRET.to_string()),
        }));

        Self {
            router,
            dispatcher,
            messenger,
            backend,
            storage,
            transcriber,
            sessions,
        }
    }
}

/// Signed `POST /callback` request
pub fn signed_callback(body: &str) -> Request<Body> {
    let sig = signature::sign(CHANNEL_SECRET, body.as_bytes()).expect("sign body");
    Request::builder()
        .method("POST")
        .uri("/callback")
        .header("content-type", "application/json")
        .header("x-line-signature", sig)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Callback body carrying one message event
pub fn message_callback(reply_token: &str, source: &serde_json::Value, message: &serde_json::Value) -> String {
    serde_json::json!({
        "destination": "Ubot",
        "events": [{
            "type": "message",
            "mode": "active",
            "timestamp": 1_700_000_000_000_i64,
            "replyToken": reply_token,
            "webhookEventId": uuid::Uuid::new_v4().to_string(),
            "deliveryContext": {"isRedelivery": false},
            "source": source,
            "message": message
        }]
    })
    .to_string()
}

/// Text of a message, or the serialized contents of a flex message
pub fn rendered(message: &OutgoingMessage) -> String {
    match message {
        OutgoingMessage::Text { text } => text.clone(),
        OutgoingMessage::Flex { contents, .. } => contents.to_string(),
    }
}
