//! Google Cloud access tokens for Storage and Speech
//!
//! Either signs a JWT assertion with a service account key, or asks the
//! metadata server of the hosting compute environment (Cloud Run, GCE).

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{Error, Result};

const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const TOKEN_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Tokens are refreshed this many seconds before they expire
const EXPIRY_MARGIN_SECS: i64 = 300;

/// Where access tokens come from
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Service account JSON key file
    ServiceAccount(PathBuf),
    /// Compute metadata server
    MetadataServer,
}

impl CredentialSource {
    /// Service account when a key file is configured, metadata server otherwise
    #[must_use]
    pub fn from_path(path: Option<PathBuf>) -> Self {
        path.map_or(Self::MetadataServer, Self::ServiceAccount)
    }
}

/// Service account JSON structure
#[derive(Debug, Deserialize)]
struct ServiceAccount {
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
}

/// JWT claims for the OAuth assertion grant
#[derive(Debug, Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    exp: i64,
    iat: i64,
}

/// Token response (same shape from both sources)
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Cached token info
struct CachedToken {
    access_token: String,
    expires_at: i64,
}

/// Cached OAuth token provider
pub struct TokenProvider {
    client: reqwest::Client,
    source: CredentialSource,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    /// Create a provider for the given credential source
    #[must_use]
    pub fn new(client: reqwest::Client, source: CredentialSource) -> Self {
        Self {
            client,
            source,
            cached: Mutex::new(None),
        }
    }

    /// Get a valid access token, refreshing it when close to expiry
    ///
    /// # Errors
    ///
    /// Returns error if the key file is unreadable or the token request fails
    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now().timestamp();

        if let Some(token) = cached.as_ref()
            && token.expires_at > now + EXPIRY_MARGIN_SECS
        {
            return Ok(token.access_token.clone());
        }

        let response = match &self.source {
            CredentialSource::ServiceAccount(path) => self.fetch_with_service_account(path).await?,
            CredentialSource::MetadataServer => self.fetch_from_metadata().await?,
        };

        tracing::debug!(expires_in = response.expires_in, "refreshed Google access token");

        let access_token = response.access_token.clone();
        *cached = Some(CachedToken {
            access_token: response.access_token,
            expires_at: now + response.expires_in,
        });

        Ok(access_token)
    }

    async fn fetch_with_service_account(&self, path: &Path) -> Result<TokenResponse> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Auth(format!("failed to read service account {}: {e}", path.display()))
        })?;
        let account: ServiceAccount = serde_json::from_str(&content)
            .map_err(|e| Error::Auth(format!("failed to parse service account: {e}")))?;

        let token_url = account.token_uri.as_deref().unwrap_or(GOOGLE_TOKEN_URL);
        let jwt = create_assertion(&account, token_url, Utc::now().timestamp())?;

        let response = self
            .client
            .post(token_url)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", jwt.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Auth(format!("token request failed: {e}")))?;

        parse_token_response(response).await
    }

    async fn fetch_from_metadata(&self) -> Result<TokenResponse> {
        let response = self
            .client
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| Error::Auth(format!("metadata server unreachable: {e}")))?;

        parse_token_response(response).await
    }
}

/// Sign the OAuth assertion for a service account
fn create_assertion(account: &ServiceAccount, audience: &str, now: i64) -> Result<String> {
    use jsonwebtoken::{Algorithm, EncodingKey, Header};

    let claims = JwtClaims {
        iss: &account.client_email,
        scope: TOKEN_SCOPE,
        aud: audience,
        exp: now + 3600,
        iat: now,
    };

    let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
        .map_err(|e| Error::Auth(format!("invalid private key: {e}")))?;

    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
        .map_err(|e| Error::Auth(format!("JWT encoding failed: {e}")))
}

async fn parse_token_response(response: reqwest::Response) -> Result<TokenResponse> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Auth(format!("token request failed: {status} - {body}")));
    }

    response
        .json()
        .await
        .map_err(|e| Error::Auth(format!("token parse error: {e}")))
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn source_prefers_key_file() {
        let source = CredentialSource::from_path(Some(PathBuf::from("/keys/sa.json")));
        assert!(matches!(source, CredentialSource::ServiceAccount(_)));
        assert!(matches!(
            CredentialSource::from_path(None),
            CredentialSource::MetadataServer
        ));
    }

    #[test]
    fn assertion_rejects_garbage_key() {
        let account = ServiceAccount {
            client_email: "bot@project.iam.gserviceaccount.com".to_string(),
            private_key: "not a pem".to_string(),
            token_uri: None,
        };

        let err = create_assertion(&account, GOOGLE_TOKEN_URL, 0).unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[tokio::test]
    async fn unreadable_key_file_is_auth_error() {
        let provider = TokenProvider::new(
            reqwest::Client::new(),
            CredentialSource::ServiceAccount(PathBuf::from("/nonexistent/sa.json")),
        );

        let err = provider.access_token().await.unwrap_err();
        assert!(err.to_string().contains("failed to read service account"), "{err}");
    }

    #[tokio::test]
    async fn malformed_key_file_is_auth_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"client_email\": 42}").unwrap();

        let provider = TokenProvider::new(
            reqwest::Client::new(),
            CredentialSource::ServiceAccount(file.path().to_path_buf()),
        );

        let err = provider.access_token().await.unwrap_err();
        assert!(err.to_string().contains("failed to parse service account"), "{err}");
    }
}
