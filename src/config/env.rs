//! Environment variable lookup helpers.

use std::env;
use std::str::FromStr;

use super::ConfigError;

pub(crate) const HOST: &str = "HOST";
pub(crate) const PORT: &str = "PORT";
pub(crate) const TLS_CERT_PATH: &str = "TLS_CERT_PATH";
pub(crate) const TLS_KEY_PATH: &str = "TLS_KEY_PATH";
pub(crate) const PUBLIC_HOST: &str = "PUBLIC_HOST";
pub(crate) const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub(crate) const OPENAI_REALTIME_URL: &str = "OPENAI_REALTIME_URL";
pub(crate) const OPENAI_REALTIME_MODEL: &str = "OPENAI_REALTIME_MODEL";
pub(crate) const VOICE: &str = "VOICE";
pub(crate) const SYSTEM_MESSAGE: &str = "SYSTEM_MESSAGE";
pub(crate) const SYSTEM_MESSAGE_PATH: &str = "SYSTEM_MESSAGE_PATH";
pub(crate) const TEMPERATURE: &str = "TEMPERATURE";
pub(crate) const AUDIO_FORMAT: &str = "AUDIO_FORMAT";
pub(crate) const SESSION_SETTLE_DELAY_MS: &str = "SESSION_SETTLE_DELAY_MS";
pub(crate) const LOG_EVENT_TYPES: &str = "LOG_EVENT_TYPES";
pub(crate) const GREETING_MESSAGE: &str = "GREETING_MESSAGE";
pub(crate) const READY_MESSAGE: &str = "READY_MESSAGE";

/// Every variable the loader reads.
pub const ALL_VARS: &[&str] = &[
    HOST,
    PORT,
    TLS_CERT_PATH,
    TLS_KEY_PATH,
    PUBLIC_HOST,
    OPENAI_API_KEY,
    OPENAI_REALTIME_URL,
    OPENAI_REALTIME_MODEL,
    VOICE,
    SYSTEM_MESSAGE,
    SYSTEM_MESSAGE_PATH,
    TEMPERATURE,
    AUDIO_FORMAT,
    SESSION_SETTLE_DELAY_MS,
    LOG_EVENT_TYPES,
    GREETING_MESSAGE,
    READY_MESSAGE,
];

/// Value of `key`, treating unset and blank the same.
pub(crate) fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parse `key` if it is set.
pub(crate) fn parse<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| ConfigError::invalid(key, format!("'{raw}': {e}")))
        })
        .transpose()
}
