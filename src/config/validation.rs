//! Configuration validation.

use tracing::warn;
use url::Url;

use super::{ConfigError, ServerConfig};
use crate::core::realtime::{RealtimeVoice, TEMPERATURE_RANGE};

pub(crate) fn validate(config: &ServerConfig) -> Result<(), ConfigError> {
    validate_api_key(&config.openai_api_key)?;
    validate_port(config.port)?;
    validate_temperature(config.temperature)?;
    validate_realtime_url(&config.realtime_url)?;

    if config.realtime_model.trim().is_empty() {
        return Err(ConfigError::invalid("realtime.model", "must not be empty"));
    }

    if !RealtimeVoice::is_known(&config.voice) {
        warn!(
            voice = %config.voice,
            "Voice is not one of the known realtime voices; passing it through unchanged"
        );
    }

    Ok(())
}

pub(crate) fn validate_api_key(key: &str) -> Result<(), ConfigError> {
    if key.trim().is_empty() {
        return Err(ConfigError::Missing("OPENAI_API_KEY"));
    }
    Ok(())
}

pub(crate) fn validate_port(port: u16) -> Result<(), ConfigError> {
    if port == 0 {
        return Err(ConfigError::invalid("port", "must be non-zero"));
    }
    Ok(())
}

pub(crate) fn validate_temperature(temperature: f64) -> Result<(), ConfigError> {
    if !TEMPERATURE_RANGE.contains(&temperature) {
        return Err(ConfigError::invalid(
            "temperature",
            format!(
                "{temperature} is outside {}..={}",
                TEMPERATURE_RANGE.start(),
                TEMPERATURE_RANGE.end()
            ),
        ));
    }
    Ok(())
}

pub(crate) fn validate_realtime_url(raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::invalid("realtime.url", e))?;
    match url.scheme() {
        "ws" | "wss" => Ok(()),
        other => Err(ConfigError::invalid(
            "realtime.url",
            format!("scheme must be ws or wss, got '{other}'"),
        )),
    }
}
