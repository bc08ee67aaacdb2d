//! LINE Gemini Gateway - LINE messaging bot backed by Gemini and Google Cloud
//!
//! Receives LINE webhooks and answers them:
//! - text: multi-turn Gemini conversation per user (`reset` starts over)
//! - image: one-shot Gemini description
//! - sticker: canned description of the sticker
//! - video: stored in Cloud Storage, transcribed with Speech-to-Text, result
//!   pushed back to the conversation as a flex bubble
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │          POST /callback (signature, parse)            │
//! └───────────────────────┬──────────────────────────────┘
//!                         │
//! ┌───────────────────────▼──────────────────────────────┐
//! │                    Dispatcher                         │
//! │  Conversations │ Image describer │ Media queue        │
//! └───────────────────────┬──────────────────────────────┘
//!                         │
//! ┌───────────────────────▼──────────────────────────────┐
//! │   Gemini  │  Cloud Storage  │  Speech  │  LINE API    │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod ai;
pub mod api;
pub mod channels;
pub mod config;
pub mod conversation;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod media;
pub mod session;
pub mod speech;
pub mod storage;

pub use config::Config;
pub use conversation::ConversationManager;
pub use dispatch::{Dispatcher, EventOutcome};
pub use error::{Error, Result};
pub use gateway::Gateway;
pub use session::SessionStore;
