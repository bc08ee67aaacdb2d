//! Gateway - wires the services together and runs the webhook server

use std::sync::Arc;
use std::time::Duration;

use crate::ai::{GeminiClient, GenerativeBackend, ImageDescriber, ModelSettings};
use crate::api::{ApiServer, ApiState};
use crate::channels::{LineChannel, Messenger};
use crate::conversation::ConversationManager;
use crate::credentials::{CredentialSource, TokenProvider};
use crate::dispatch::Dispatcher;
use crate::media::{MediaPipeline, MediaQueue};
use crate::session::SessionStore;
use crate::speech::GoogleSpeechClient;
use crate::storage::{GcsClient, ObjectNamer};
use crate::{Config, Error, Result};

/// The running gateway
pub struct Gateway {
    server: ApiServer,
    sessions: Arc<SessionStore>,
    sweep_interval: Duration,
}

impl Gateway {
    /// Build every service from configuration
    ///
    /// Must be called inside a Tokio runtime (the media worker is spawned here).
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: Config) -> Result<Self> {
        let client = http_client(config.http_timeout)?;

        let messenger: Arc<dyn Messenger> =
            Arc::new(LineChannel::new(client.clone(), config.line.channel_access_token));

        let backend: Arc<dyn GenerativeBackend> = Arc::new(GeminiClient::new(
            client.clone(),
            config.gemini.api_key,
            config.gemini.base_url,
        ));

        let tokens = Arc::new(TokenProvider::new(
            client.clone(),
            CredentialSource::from_path(config.storage.credentials),
        ));
        let storage = Arc::new(GcsClient::new(
            client.clone(),
            Arc::clone(&tokens),
            config.storage.bucket.clone(),
            config.storage.project_id.clone(),
        ));
        let transcriber = Arc::new(GoogleSpeechClient::new(
            client,
            tokens,
            config.storage.project_id,
        ));

        let sessions = Arc::new(SessionStore::from_config(&config.session));
        let conversations = Arc::new(ConversationManager::new(
            Arc::clone(&sessions),
            Arc::clone(&backend),
            ModelSettings::chat(config.gemini.chat_model.clone()),
        ));
        let describer = Arc::new(ImageDescriber::new(backend, config.gemini.vision_model.clone()));

        let pipeline = Arc::new(MediaPipeline::new(
            Arc::clone(&messenger),
            storage,
            transcriber,
            ObjectNamer::new(config.storage.upload_prefix.clone()),
        ));
        let media_queue = MediaQueue::start(pipeline, &config.media);

        let dispatcher = Arc::new(Dispatcher::new(messenger, conversations, describer, media_queue));

        tracing::info!(
            chat_model = %config.gemini.chat_model,
            vision_model = %config.gemini.vision_model,
            bucket = %config.storage.bucket,
            max_sessions = config.session.max_sessions,
            "gateway initialized"
        );

        let server = ApiServer::new(
            ApiState {
                dispatcher,
                channel_secret: config.line.channel_secret,
            },
            config.server.bind_addr(),
        );

        Ok(Self {
            server,
            sessions,
            sweep_interval: config.session.sweep_interval,
        })
    }

    /// Serve webhooks until the server stops
    ///
    /// # Errors
    ///
    /// Returns error if the server cannot bind or fails
    pub async fn run(self) -> Result<()> {
        spawn_session_sweeper(self.sessions, self.sweep_interval);
        self.server.run().await
    }
}

/// Shared client for every outbound call; `timeout` bounds each request
///
/// # Errors
///
/// Returns error if the TLS backend cannot be initialized
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))
}

/// Periodically drop idle sessions
fn spawn_session_sweeper(sessions: Arc<SessionStore>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every.max(Duration::from_secs(1)));
        // First tick fires immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            let purged = sessions.purge_expired();
            if purged > 0 {
                tracing::info!(purged, remaining = sessions.len(), "expired sessions swept");
            }
        }
    });
}
