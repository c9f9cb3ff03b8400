//! Configuration management for the MCP server.
//!
//! This module provides a centralized configuration structure populated
//! from environment variables (optionally through a `.env` file) or defaults.
//! Nothing here validates credentials: presence checks happen when the
//! Apple Music client is built, before any network activity.

use super::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Default storefront (ISO 3166 alpha-2 country code).
pub const DEFAULT_STOREFRONT: &str = "us";

/// Directory name used under `$HOME` when no config dir is given.
pub const DEFAULT_CONFIG_DIR_NAME: &str = ".apple-music-mcp";

/// Main configuration structure for the MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,

    /// Apple Music credentials and client settings.
    pub apple_music: AppleMusicConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,

    /// Whether to include timestamps in log output.
    pub with_timestamps: bool,
}

/// Where the service credential's signing key comes from.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "source", content = "value", rename_all = "lowercase")]
pub enum PrivateKeySource {
    /// Path to a PKCS#8 `.p8` PEM file.
    Path(PathBuf),
    /// Base64-encoded PEM text (handy for hosted environments).
    Base64(String),
    /// PEM text.
    Pem(String),
}

impl std::fmt::Debug for PrivateKeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Base64(_) => f.write_str("Base64([REDACTED])"),
            Self::Pem(_) => f.write_str("Pem([REDACTED])"),
        }
    }
}

/// How the service credential is kept between calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialMode {
    /// Credentials live in `tokens.json` and survive restarts; the service
    /// credential is re-minted once it passes the staleness threshold.
    #[default]
    Persistent,
    /// Nothing touches disk; the service credential is re-minted on a short
    /// in-process cadence and the user credential comes from configuration.
    ProcessLocal,
}

impl CredentialMode {
    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "persistent" | "file" => Some(Self::Persistent),
            "process" | "process_local" | "memory" => Some(Self::ProcessLocal),
            _ => None,
        }
    }
}

/// Apple Music credentials and client settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppleMusicConfig {
    /// Apple Developer Team ID (issuer of the service credential).
    pub team_id: Option<String>,

    /// MusicKit key identifier.
    pub key_id: Option<String>,

    /// Signing key material.
    pub private_key: Option<PrivateKeySource>,

    /// Default storefront for catalog requests.
    pub storefront: String,

    /// Directory holding the persisted credential file.
    pub config_dir: PathBuf,

    /// Pre-provisioned Music User Token.
    pub user_token: Option<String>,

    /// Credential deployment mode.
    pub credential_mode: CredentialMode,
}

/// Custom Debug implementation to redact secrets from logs.
impl std::fmt::Debug for AppleMusicConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppleMusicConfig")
            .field("team_id", &self.team_id)
            .field("key_id", &self.key_id)
            .field("private_key", &self.private_key)
            .field("storefront", &self.storefront)
            .field("config_dir", &self.config_dir)
            .field("user_token", &self.user_token.as_ref().map(|_| "[REDACTED]"))
            .field("credential_mode", &self.credential_mode)
            .finish()
    }
}

impl Default for AppleMusicConfig {
    fn default() -> Self {
        Self {
            team_id: None,
            key_id: None,
            private_key: None,
            storefront: DEFAULT_STOREFRONT.to_string(),
            config_dir: default_config_dir(),
            user_token: None,
            credential_mode: CredentialMode::default(),
        }
    }
}

fn default_config_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_CONFIG_DIR_NAME)
}

/// Read a variable, treating empty values as unset.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl AppleMusicConfig {
    /// Load Apple Music settings from `APPLE_MUSIC_*` variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.team_id = env_var("APPLE_MUSIC_TEAM_ID");
        config.key_id = env_var("APPLE_MUSIC_KEY_ID");

        // The inline key wins over the path so hosted deployments need no file.
        config.private_key = env_var("APPLE_MUSIC_PRIVATE_KEY")
            .map(PrivateKeySource::Base64)
            .or_else(|| {
                env_var("APPLE_MUSIC_PRIVATE_KEY_PATH")
                    .map(|p| PrivateKeySource::Path(PathBuf::from(p)))
            });

        if let Some(storefront) = env_var("APPLE_MUSIC_STOREFRONT") {
            config.storefront = storefront.to_lowercase();
        }

        if let Some(dir) = env_var("APPLE_MUSIC_CONFIG_DIR") {
            config.config_dir = PathBuf::from(dir);
        }

        config.user_token = env_var("APPLE_MUSIC_USER_TOKEN");
        if config.user_token.is_some() {
            info!("Music User Token loaded from environment");
        }

        if let Some(mode) = env_var("APPLE_MUSIC_CREDENTIAL_MODE") {
            match CredentialMode::parse(&mode) {
                Some(parsed) => config.credential_mode = parsed,
                None => warn!(
                    "Unknown APPLE_MUSIC_CREDENTIAL_MODE '{}', using {:?}",
                    mode, config.credential_mode
                ),
            }
        }

        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "apple-music".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                with_timestamps: true,
            },
            transport: TransportConfig::default(),
            apple_music: AppleMusicConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Server settings use the `MCP_` prefix (`MCP_SERVER_NAME`,
    /// `MCP_LOG_LEVEL`, `MCP_TRANSPORT`, ...); Apple Music settings use
    /// `APPLE_MUSIC_`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        config.transport = TransportConfig::from_env();
        config.apple_music = AppleMusicConfig::from_env();

        config
    }
}
