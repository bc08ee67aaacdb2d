//! Speech recognition for stored media

pub mod google;

use async_trait::async_trait;

use crate::Result;
use crate::storage::StoredObject;

pub use google::GoogleSpeechClient;

/// Remote speech-to-text service reading from object storage
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Recognize speech in a stored object
    ///
    /// An empty string means nothing was recognized; that is not an error.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transcription` (or `Error::Auth`) if the call fails
    async fn transcribe(&self, object: &StoredObject) -> Result<String>;
}
