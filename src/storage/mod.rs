//! Durable object storage for inbound media
//!
//! Objects are written under generated keys and served back through their
//! public URL, so the bucket must allow public reads.

pub mod gcs;

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Local};

use crate::Result;

pub use gcs::GcsClient;

/// Kind of media being stored, which decides the key extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// File extension without the dot
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Image => "jpeg",
            Self::Video => "mp4",
        }
    }

    /// Content type sent with the upload
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Image => "image/jpeg",
            Self::Video => "video/mp4",
        }
    }
}

/// A stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
}

impl StoredObject {
    /// Public HTTPS address of the object
    #[must_use]
    pub fn public_url(&self) -> String {
        format!("https://storage.googleapis.com/{}/{}", self.bucket, self.key)
    }

    /// `gs://` URI used by other Google services
    #[must_use]
    pub fn gs_uri(&self) -> String {
        format!("gs://{}/{}", self.bucket, self.key)
    }
}

/// Remote object storage
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload `data` under `key`
    ///
    /// # Errors
    ///
    /// Returns `Error::Storage` (or `Error::Auth`) if the upload fails
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<StoredObject>;
}

/// Generates object keys of the form
/// `<prefix><YYYYMMDDhhmmss>-<seq>-<rand>.<ext>`
///
/// `seq` is a process-wide counter, so two names generated in the same second
/// never collide; `rand` separates processes sharing a bucket.
#[derive(Debug)]
pub struct ObjectNamer {
    prefix: String,
    sequence: AtomicU64,
}

impl ObjectNamer {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Next key for the given media kind
    pub fn next_key(&self, kind: MediaKind) -> String {
        self.key_at(kind, Local::now())
    }

    fn key_at(&self, kind: MediaKind, at: DateTime<Local>) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!(
            "{}{}-{seq:06}-{}.{}",
            self.prefix,
            at.format("%Y%m%d%H%M%S"),
            &suffix[..8],
            kind.extension()
        )
    }
}
