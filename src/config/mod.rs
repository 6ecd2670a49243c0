//! Configuration module for the phone relay server
//!
//! This module handles server configuration from .env files, environment
//! variables and an optional YAML file. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `env`: Environment variable loading
//! - `yaml`: YAML configuration file loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use phone_relay::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable base
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::core::realtime::AudioFormat;
use crate::core::relay::LogEventTypes;

mod env;
mod merge;
mod validation;
mod yaml;

pub use env::ALL_VARS as ENV_VARS;
pub use yaml::YamlConfig;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5050;
pub const DEFAULT_TEMPERATURE: f64 = 0.8;
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 250;

/// Instructions used when neither `SYSTEM_MESSAGE` nor a file is configured.
pub const DEFAULT_INSTRUCTIONS: &str = "You are a friendly and helpful voice assistant answering a phone call. \
Keep your answers short and conversational, ask one question at a time, \
and wait for the caller to finish speaking before you reply.";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        ConfigError::InvalidValue {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains everything needed to run the relay:
/// - Server settings (host, port, TLS, public host)
/// - Realtime backend credentials and session parameters
/// - Call-setup document text
#[derive(Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    pub tls: Option<TlsConfig>,
    /// Host advertised in the call-setup document instead of the request's `Host`
    pub public_host: Option<String>,

    // Realtime backend
    pub openai_api_key: String,
    pub realtime_url: String,
    pub realtime_model: String,
    pub voice: String,
    pub instructions: String,
    pub temperature: f64,
    pub audio_format: AudioFormat,
    pub settle_delay_ms: u64,
    pub log_event_types: LogEventTypes,

    // Call-setup document
    pub greeting_message: String,
    pub ready_message: String,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("public_host", &self.public_host)
            .field("openai_api_key", &"<redacted>")
            .field("realtime_url", &self.realtime_url)
            .field("realtime_model", &self.realtime_model)
            .field("voice", &self.voice)
            .field("temperature", &self.temperature)
            .field("audio_format", &self.audio_format)
            .field("settle_delay_ms", &self.settle_delay_ms)
            .field("log_event_types", &self.log_event_types)
            .finish_non_exhaustive()
    }
}

/// Zeroize the API key when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        self.openai_api_key.zeroize();
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// The .env file is loaded in main.rs at startup, so its values are
    /// already visible here as environment variables.
    ///
    /// # Errors
    /// Returns an error if a variable has an invalid format or validation
    /// fails (for example when `OPENAI_API_KEY` is missing).
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = merge::merge_config(None)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if the YAML file cannot be read or is malformed,
    /// an environment variable has an invalid format, or validation fails.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Realtime endpoint with the configured model as the `model` query
    /// parameter. A `model` already present in the URL is kept.
    pub fn realtime_endpoint(&self) -> Result<String, ConfigError> {
        let mut url = Url::parse(&self.realtime_url)
            .map_err(|e| ConfigError::invalid("realtime.url", e))?;
        if !url.query_pairs().any(|(key, _)| key == "model") {
            url.query_pairs_mut()
                .append_pair("model", &self.realtime_model);
        }
        Ok(url.to_string())
    }
}
