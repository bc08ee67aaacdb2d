//! Per-user multi-turn conversations
//!
//! Thin layer over [`SessionStore`] and a [`GenerativeBackend`]: resolves the
//! caller's session, handles the `reset` command, and folds failures into a
//! user-facing apology.

use std::sync::Arc;

use crate::Result;
use crate::ai::{ChatSession, GenerativeBackend, ModelSettings, SessionHandle};
use crate::session::SessionStore;

/// Text command that discards the caller's history
pub const RESET_COMMAND: &str = "reset";

/// Reply sent after a reset
pub const GREETING: &str = "很高興初次見到你，請問有什麼想了解的嗎？";

/// Prefix of the reply sent when a turn fails
pub const APOLOGY_PREFIX: &str = "抱歉，目前無法回覆您的訊息：";

/// Conversation manager shared by all webhook tasks
pub struct ConversationManager {
    store: Arc<SessionStore>,
    backend: Arc<dyn GenerativeBackend>,
    settings: ModelSettings,
}

impl ConversationManager {
    /// Create a manager; new sessions use `settings`
    #[must_use]
    pub fn new(
        store: Arc<SessionStore>,
        backend: Arc<dyn GenerativeBackend>,
        settings: ModelSettings,
    ) -> Self {
        Self {
            store,
            backend,
            settings,
        }
    }

    fn new_session(&self) -> SessionHandle {
        Arc::new(ChatSession::new(self.settings.clone()))
    }

    /// Existing session for `user_id`, or a freshly created one
    pub fn get_or_create_session(&self, user_id: &str) -> SessionHandle {
        self.store
            .get_or_insert_with(user_id, || {
                tracing::debug!(user = user_id, "starting new chat session");
                self.new_session()
            })
    }

    /// Replace the session for `user_id` with an empty one
    pub fn reset_session(&self, user_id: &str) -> SessionHandle {
        let session = self.new_session();
        self.store.replace(user_id, session.clone());
        tracing::info!(user = user_id, session = %session.id(), "chat session reset");
        session
    }

    /// Exchange one turn on `session`
    ///
    /// # Errors
    ///
    /// Returns the backend error; the session history is unchanged on failure
    pub async fn send_turn(&self, session: &ChatSession, message: &str) -> Result<String> {
        session.send(self.backend.as_ref(), message).await
    }

    /// Reply text for an incoming text message from `user_id`
    ///
    /// Never fails: errors become an apology carrying the error description.
    pub async fn respond(&self, user_id: &str, text: &str) -> String {
        if text == RESET_COMMAND {
            self.reset_session(user_id);
            return GREETING.to_string();
        }

        let session = self.get_or_create_session(user_id);
        match self.send_turn(&session, text).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(user = user_id, remote = e.is_remote(), error = %e, "chat turn failed");
                format!("{APOLOGY_PREFIX}{e}")
            }
        }
    }
}
