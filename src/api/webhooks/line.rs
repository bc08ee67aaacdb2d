//! LINE webhook handler
//!
//! The body is verified against `x-line-signature` before it is parsed. An
//! invalid signature answers 400, an unparseable body 500, and anything else
//! 200 once every event has been dispatched.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use secrecy::ExposeSecret;

use crate::api::ApiState;
use crate::channels::line::CallbackRequest;
use crate::channels::line::signature::{self, SIGNATURE_HEADER};

/// Handle `POST /callback`
pub async fn handle_callback(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if let Err(e) = signature::verify(state.channel_secret.expose_secret(), &body, signature) {
        tracing::warn!(error = %e, "rejected webhook");
        return StatusCode::BAD_REQUEST;
    }

    let request: CallbackRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::error!(error = %e, "failed to parse webhook body");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };

    let outcomes = state.dispatcher.handle_callback(request).await;
    tracing::debug!(events = outcomes.len(), "webhook handled");

    StatusCode::OK
}
