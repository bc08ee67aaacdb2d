//! Error types for the LINE gateway

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (fatal at startup)
    #[error("configuration error: {0}")]
    Config(String),

    /// Webhook body failed the `x-line-signature` check
    #[error("invalid webhook signature")]
    Signature,

    /// Generative AI service error
    #[error("AI service error: {0}")]
    Ai(String),

    /// Object storage error
    #[error("storage error: {0}")]
    Storage(String),

    /// Speech recognition error
    #[error("transcription error: {0}")]
    Transcription(String),

    /// Messaging channel error (reply, push, content fetch)
    #[error("channel error: {0}")]
    Channel(String),

    /// Google credential error
    #[error("auth error: {0}")]
    Auth(String),

    /// Media job scheduling error
    #[error("media error: {0}")]
    Media(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Whether this error came from a remote service call
    ///
    /// Remote failures are recovered into user-visible text; everything else
    /// is either a startup failure or a request-level rejection.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Ai(_)
                | Self::Storage(_)
                | Self::Transcription(_)
                | Self::Channel(_)
                | Self::Auth(_)
                | Self::Http(_)
        )
    }
}
