//! HTTP surface
//!
//! `POST /callback` receives LINE webhooks; `GET /health` is the liveness
//! check.

pub mod health;
pub mod webhooks;

use std::sync::Arc;

use axum::Router;
use secrecy::SecretString;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::dispatch::Dispatcher;

/// Shared state for request handlers
pub struct ApiState {
    pub dispatcher: Arc<Dispatcher>,
    /// Key for `x-line-signature` verification
    pub channel_secret: SecretString,
}

/// HTTP server
pub struct ApiServer {
    state: Arc<ApiState>,
    bind_addr: String,
}

impl ApiServer {
    #[must_use]
    pub fn new(state: ApiState, bind_addr: impl Into<String>) -> Self {
        Self {
            state: Arc::new(state),
            bind_addr: bind_addr.into(),
        }
    }

    /// Build the router
    pub fn router(&self) -> Router {
        router(Arc::clone(&self.state))
    }

    /// Run the server until the process stops
    ///
    /// # Errors
    ///
    /// Returns error if the listener cannot bind or the server fails
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(&self.bind_addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind {}: {e}", self.bind_addr)))?;

        tracing::info!(addr = %self.bind_addr, "webhook server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("webhook server error: {e}")))?;

        Ok(())
    }
}

/// Router with all endpoints and request tracing
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .merge(webhooks::router(state))
        .merge(health::router())
        .layer(TraceLayer::new_for_http())
}
