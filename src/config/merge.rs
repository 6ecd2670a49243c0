//! Merge environment variables with YAML overrides.

use std::path::PathBuf;

use super::env;
use super::yaml::{CallYaml, RealtimeYaml, ServerYaml, YamlConfig};
use super::{
    ConfigError, DEFAULT_HOST, DEFAULT_INSTRUCTIONS, DEFAULT_PORT, DEFAULT_SETTLE_DELAY_MS,
    DEFAULT_TEMPERATURE, ServerConfig, TlsConfig,
};
use crate::core::realtime::{AudioFormat, DEFAULT_REALTIME_MODEL, OPENAI_REALTIME_URL, RealtimeVoice};
use crate::core::relay::LogEventTypes;
use crate::core::telephony::{DEFAULT_GREETING, DEFAULT_READY_MESSAGE};

/// Build a [`ServerConfig`] from the environment, letting `yaml` override
/// any value it sets. Defaults fill whatever neither source provides.
pub(crate) fn merge_config(yaml: Option<YamlConfig>) -> Result<ServerConfig, ConfigError> {
    let yaml = yaml.unwrap_or_default();
    let server = yaml.server.unwrap_or_default();
    let realtime = yaml.realtime.unwrap_or_default();
    let call = yaml.call.unwrap_or_default();

    let port = match server.port {
        Some(port) => port,
        None => env::parse::<u16>(env::PORT)?.unwrap_or(DEFAULT_PORT),
    };

    let temperature = match realtime.temperature {
        Some(temperature) => temperature,
        None => env::parse::<f64>(env::TEMPERATURE)?.unwrap_or(DEFAULT_TEMPERATURE),
    };

    let audio_format = match realtime.audio_format.as_deref() {
        Some(raw) => raw
            .parse::<AudioFormat>()
            .map_err(|e| ConfigError::invalid("realtime.audio_format", e))?,
        None => env::parse::<AudioFormat>(env::AUDIO_FORMAT)?.unwrap_or_default(),
    };

    let settle_delay_ms = match realtime.settle_delay_ms {
        Some(ms) => ms,
        None => env::parse::<u64>(env::SESSION_SETTLE_DELAY_MS)?.unwrap_or(DEFAULT_SETTLE_DELAY_MS),
    };

    let log_event_types = match realtime.log_event_types.as_ref() {
        Some(types) => LogEventTypes::new(types.iter().map(|t| t.trim().to_string())),
        None => env::var(env::LOG_EVENT_TYPES)
            .map(|list| LogEventTypes::from_csv(&list))
            .unwrap_or_default(),
    };

    Ok(ServerConfig {
        host: server
            .host
            .clone()
            .or_else(|| env::var(env::HOST))
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port,
        tls: merge_tls(&server)?,
        public_host: server.public_host.clone().or_else(|| env::var(env::PUBLIC_HOST)),
        openai_api_key: realtime
            .api_key
            .clone()
            .or_else(|| env::var(env::OPENAI_API_KEY))
            .unwrap_or_default(),
        realtime_url: realtime
            .url
            .clone()
            .or_else(|| env::var(env::OPENAI_REALTIME_URL))
            .unwrap_or_else(|| OPENAI_REALTIME_URL.to_string()),
        realtime_model: realtime
            .model
            .clone()
            .or_else(|| env::var(env::OPENAI_REALTIME_MODEL))
            .unwrap_or_else(|| DEFAULT_REALTIME_MODEL.to_string()),
        voice: realtime
            .voice
            .clone()
            .or_else(|| env::var(env::VOICE))
            .unwrap_or_else(|| RealtimeVoice::default().as_str().to_string()),
        instructions: merge_instructions(&realtime)?,
        temperature,
        audio_format,
        settle_delay_ms,
        log_event_types,
        greeting_message: merge_call_text(&call, |c| c.greeting.clone(), env::GREETING_MESSAGE)
            .unwrap_or_else(|| DEFAULT_GREETING.to_string()),
        ready_message: merge_call_text(&call, |c| c.ready_message.clone(), env::READY_MESSAGE)
            .unwrap_or_else(|| DEFAULT_READY_MESSAGE.to_string()),
    })
}

fn merge_tls(server: &ServerYaml) -> Result<Option<TlsConfig>, ConfigError> {
    let tls = server.tls.clone().unwrap_or_default();
    let cert = tls.cert_path.or_else(|| env::var(env::TLS_CERT_PATH));
    let key = tls.key_path.or_else(|| env::var(env::TLS_KEY_PATH));

    match (cert, key) {
        (Some(cert_path), Some(key_path)) => Ok(Some(TlsConfig {
            cert_path: PathBuf::from(cert_path),
            key_path: PathBuf::from(key_path),
        })),
        (None, None) => Ok(None),
        _ => Err(ConfigError::invalid(
            "tls",
            "certificate and key paths must be set together",
        )),
    }
}

/// Instructions text. Within each source a file path wins over inline text.
fn merge_instructions(realtime: &RealtimeYaml) -> Result<String, ConfigError> {
    if let Some(path) = realtime.instructions_path.as_deref() {
        return read_instructions(path);
    }
    if let Some(text) = realtime.instructions.clone() {
        return Ok(text);
    }
    if let Some(path) = env::var(env::SYSTEM_MESSAGE_PATH) {
        return read_instructions(&path);
    }
    Ok(env::var(env::SYSTEM_MESSAGE).unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string()))
}

fn read_instructions(path: &str) -> Result<String, ConfigError> {
    let path = PathBuf::from(path);
    std::fs::read_to_string(&path)
        .map(|text| text.trim().to_string())
        .map_err(|source| ConfigError::ReadFile { path, source })
}

fn merge_call_text(
    call: &CallYaml,
    pick: impl Fn(&CallYaml) -> Option<String>,
    env_key: &str,
) -> Option<String> {
    pick(call).or_else(|| env::var(env_key))
}
