//! TOML configuration file loading
//!
//! Supports `~/.config/line-gemini/config.toml` (or an explicit `--config`
//! path) as a persistent config source. All fields are optional; the file is
//! a partial overlay between environment variables and defaults. Secrets
//! (channel secret, access token, API key) are only read from the environment.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfigFile {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Gemini model configuration
    #[serde(default)]
    pub gemini: GeminiFileConfig,

    /// Cloud Storage configuration
    #[serde(default)]
    pub storage: StorageFileConfig,

    /// Session store configuration
    #[serde(default)]
    pub session: SessionFileConfig,

    /// Media pipeline configuration
    #[serde(default)]
    pub media: MediaFileConfig,

    /// Outbound HTTP configuration
    #[serde(default)]
    pub http: HttpFileConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GeminiFileConfig {
    /// Model used for multi-turn conversations
    pub chat_model: Option<String>,
    /// Model used for one-shot image descriptions
    pub vision_model: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StorageFileConfig {
    pub bucket: Option<String>,
    pub project_id: Option<String>,
    /// Object key prefix, e.g. `"test-files/"`
    pub upload_prefix: Option<String>,
    /// Service account JSON path (falls back to the metadata server)
    pub credentials: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionFileConfig {
    pub max_sessions: Option<usize>,
    /// Idle time before a session is dropped; `0` keeps sessions forever
    pub idle_ttl_secs: Option<u64>,
    pub sweep_interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MediaFileConfig {
    pub queue_capacity: Option<usize>,
    pub max_concurrent_jobs: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HttpFileConfig {
    pub timeout_secs: Option<u64>,
}

/// Default config file location: `<config dir>/line-gemini/config.toml`
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("line-gemini").join("config.toml"))
}

/// Load the config file
///
/// An explicit path must exist and parse. The default location is optional:
/// a missing file yields an empty overlay.
///
/// # Errors
///
/// Returns error if an explicit file cannot be read, or any file fails to parse
pub fn load_config_file(explicit: Option<&Path>) -> Result<GatewayConfigFile> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path)?;
        return parse_config_file(&content);
    }

    let Some(path) = default_config_path() else {
        return Ok(GatewayConfigFile::default());
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => {
            tracing::debug!(path = %path.display(), "loaded config file");
            parse_config_file(&content)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(GatewayConfigFile::default()),
        Err(e) => Err(e.into()),
    }
}

/// Parse TOML text into the file schema
///
/// # Errors
///
/// Returns error if the TOML is malformed or has unknown keys
pub fn parse_config_file(content: &str) -> Result<GatewayConfigFile> {
    Ok(toml::from_str(content)?)
}
