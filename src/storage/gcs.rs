//! Google Cloud Storage uploads via the JSON API

use std::sync::Arc;

use async_trait::async_trait;

use super::{ObjectStorage, StoredObject};
use crate::credentials::TokenProvider;
use crate::{Error, Result};

const UPLOAD_BASE_URL: &str = "https://storage.googleapis.com/upload/storage/v1/b";

/// Cloud Storage client for one bucket
pub struct GcsClient {
    client: reqwest::Client,
    tokens: Arc<TokenProvider>,
    bucket: String,
    project_id: String,
}

impl GcsClient {
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        tokens: Arc<TokenProvider>,
        bucket: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            tokens,
            bucket: bucket.into(),
            project_id: project_id.into(),
        }
    }

    fn upload_url(&self) -> String {
        format!("{UPLOAD_BASE_URL}/{}/o", self.bucket)
    }
}

#[async_trait]
impl ObjectStorage for GcsClient {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<StoredObject> {
        let token = self.tokens.access_token().await?;
        let size = data.len();

        let response = self
            .client
            .post(self.upload_url())
            .query(&[("uploadType", "media"), ("name", key)])
            .bearer_auth(token)
            .header("x-goog-user-project", &self.project_id)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("upload request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, key, "Cloud Storage upload failed");
            return Err(Error::Storage(format!("upload failed {status}: {body}")));
        }

        tracing::info!(bucket = %self.bucket, key, bytes = size, "object uploaded");
        Ok(StoredObject {
            bucket: self.bucket.clone(),
            key: key.to_string(),
        })
    }
}
