//! Configuration management for the LINE gateway
//!
//! Values resolve as env > TOML file > default. The channel credentials,
//! Gemini key, bucket, project id and listen port are required; a missing one
//! aborts startup with the offending variable named.

pub mod file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;

use self::file::GatewayConfigFile;
use crate::{Error, Result};

/// Default Gemini model for conversations
pub const DEFAULT_CHAT_MODEL: &str = "gemini-1.5-flash";

/// Default Gemini model for image descriptions
pub const DEFAULT_VISION_MODEL: &str = "gemini-1.5-flash";

/// Default Gemini REST endpoint
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default object key prefix for uploads
pub const DEFAULT_UPLOAD_PREFIX: &str = "test-files/";

/// Gateway configuration
#[derive(Debug)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// LINE channel credentials
    pub line: LineConfig,

    /// Gemini configuration
    pub gemini: GeminiConfig,

    /// Cloud Storage configuration
    pub storage: StorageConfig,

    /// Session store configuration
    pub session: SessionConfig,

    /// Media pipeline configuration
    pub media: MediaConfig,

    /// Timeout applied to every outbound HTTP request
    pub http_timeout: Duration,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,

    /// Port to listen on (`PORT` env)
    pub port: u16,
}

impl ServerConfig {
    /// Socket address string for the listener
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// LINE Messaging API credentials
#[derive(Debug)]
pub struct LineConfig {
    /// Channel secret used to verify webhook signatures (`ChannelSecret`)
    pub channel_secret: SecretString,

    /// Channel access token for reply/push/content (`ChannelAccessToken`)
    pub channel_access_token: SecretString,
}

/// Gemini configuration
#[derive(Debug)]
pub struct GeminiConfig {
    /// API key (`GOOGLE_GEMINI_API_KEY`)
    pub api_key: SecretString,

    /// Model for multi-turn chat sessions
    pub chat_model: String,

    /// Model for one-shot image description
    pub vision_model: String,

    /// REST base URL
    pub base_url: String,
}

/// Cloud Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Bucket name (`GCS_BUCKET_NAME`); must be public-read for the result URL
    pub bucket: String,

    /// Project id (`GCS_PROJECT_ID`), billed for storage and speech requests
    pub project_id: String,

    /// Object key prefix
    pub upload_prefix: String,

    /// Service account JSON (`GOOGLE_APPLICATION_CREDENTIALS`); the metadata
    /// server is used when absent
    pub credentials: Option<PathBuf>,
}

/// Session store configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum live sessions before least-recently-used eviction
    pub max_sessions: usize,

    /// Idle expiry; `None` keeps sessions until evicted by capacity
    pub idle_ttl: Option<Duration>,

    /// How often expired sessions are swept
    pub sweep_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: 10_000,
            idle_ttl: Some(Duration::from_secs(24 * 60 * 60)),
            sweep_interval: Duration::from_secs(300),
        }
    }
}

/// Media pipeline configuration
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Pending jobs buffered before `submit` rejects new ones
    pub queue_capacity: usize,

    /// Jobs processed at the same time
    pub max_concurrent_jobs: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            max_concurrent_jobs: 4,
        }
    }
}

impl Config {
    /// Load configuration from the process environment and config file
    ///
    /// # Errors
    ///
    /// Returns error if a required value is missing or a value is malformed
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let fc = file::load_config_file(config_path)?;
        Self::from_sources(|key| std::env::var(key).ok(), fc)
    }

    /// Build configuration from an env lookup and a parsed config file
    ///
    /// # Errors
    ///
    /// Returns error if a required value is missing or a value is malformed
    pub fn from_sources<F>(env: F, fc: GatewayConfigFile) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            env(key).ok_or_else(|| Error::Config(format!("{key} is not set")))
        };

        let port = match env("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| Error::Config(format!("PORT is not a valid port ({raw}): {e}")))?,
            None => fc
                .server
                .port
                .ok_or_else(|| Error::Config("PORT is not set".to_string()))?,
        };

        let server = ServerConfig {
            host: env("HOST")
                .or(fc.server.host)
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
        };

        let line = LineConfig {
            channel_secret: SecretString::from(required("ChannelSecret")?),
            channel_access_token: SecretString::from(required("ChannelAccessToken")?),
        };

        let gemini = GeminiConfig {
            api_key: SecretString::from(required("GOOGLE_GEMINI_API_KEY")?),
            chat_model: env("GEMINI_CHAT_MODEL")
                .or(fc.gemini.chat_model)
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            vision_model: env("GEMINI_VISION_MODEL")
                .or(fc.gemini.vision_model)
                .unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
            base_url: env("GEMINI_BASE_URL")
                .or(fc.gemini.base_url)
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
        };

        let storage = StorageConfig {
            bucket: env("GCS_BUCKET_NAME")
                .or(fc.storage.bucket)
                .ok_or_else(|| Error::Config("GCS_BUCKET_NAME is not set".to_string()))?,
            project_id: env("GCS_PROJECT_ID")
                .or(fc.storage.project_id)
                .ok_or_else(|| Error::Config("GCS_PROJECT_ID is not set".to_string()))?,
            upload_prefix: env("GCS_UPLOAD_PREFIX")
                .or(fc.storage.upload_prefix)
                .unwrap_or_else(|| DEFAULT_UPLOAD_PREFIX.to_string()),
            credentials: env("GOOGLE_APPLICATION_CREDENTIALS")
                .map(PathBuf::from)
                .or(fc.storage.credentials),
        };

        let session_defaults = SessionConfig::default();
        let idle_ttl_secs = parse_env(&env, "SESSION_IDLE_TTL_SECS")?.or(fc.session.idle_ttl_secs);
        let session = SessionConfig {
            max_sessions: parse_env(&env, "SESSION_MAX")?
                .or(fc.session.max_sessions)
                .unwrap_or(session_defaults.max_sessions),
            idle_ttl: match idle_ttl_secs {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => session_defaults.idle_ttl,
            },
            sweep_interval: parse_env(&env, "SESSION_SWEEP_INTERVAL_SECS")?
                .or(fc.session.sweep_interval_secs)
                .map_or(session_defaults.sweep_interval, Duration::from_secs),
        };
        if session.max_sessions == 0 {
            return Err(Error::Config("SESSION_MAX must be at least 1".to_string()));
        }

        let media_defaults = MediaConfig::default();
        let media = MediaConfig {
            queue_capacity: parse_env(&env, "MEDIA_QUEUE_CAPACITY")?
                .or(fc.media.queue_capacity)
                .unwrap_or(media_defaults.queue_capacity)
                .max(1),
            max_concurrent_jobs: parse_env(&env, "MEDIA_MAX_CONCURRENT_JOBS")?
                .or(fc.media.max_concurrent_jobs)
                .unwrap_or(media_defaults.max_concurrent_jobs)
                .max(1),
        };

        let http_timeout = Duration::from_secs(
            parse_env(&env, "HTTP_TIMEOUT_SECS")?
                .or(fc.http.timeout_secs)
                .unwrap_or(50),
        );

        Ok(Self {
            server,
            line,
            gemini,
            storage,
            session,
            media,
            http_timeout,
        })
    }
}

/// Parse an optional numeric env value, rejecting garbage instead of ignoring it
fn parse_env<T, F>(env: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    env(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| Error::Config(format!("{key} is invalid ({raw}): {e}")))
        })
        .transpose()
}
