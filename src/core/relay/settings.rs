//! Process-wide, read-only settings shared by every relay instance.

use std::fmt;
use std::time::Duration;

use zeroize::Zeroize;

use crate::config::{ConfigError, ServerConfig};
use crate::core::adapter::ConnectTarget;
use crate::core::realtime::{Modality, SessionConfig, TurnDetection};

use super::classifier::LogEventTypes;

/// How long teardown waits for the realtime leg to confirm it closed.
pub const DEFAULT_CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Everything a relay instance needs to open and configure its realtime leg.
#[derive(Clone)]
pub struct RelaySettings {
    /// Realtime endpoint, including the model query parameter
    pub realtime_url: String,
    api_key: String,
    /// Body of the one `session.update` sent per call
    pub session: SessionConfig,
    /// Wait between the realtime leg opening and sending `session.update`
    pub settle_delay: Duration,
    pub log_event_types: LogEventTypes,
    pub close_grace: Duration,
}

impl RelaySettings {
    pub fn new(
        realtime_url: impl Into<String>,
        api_key: impl Into<String>,
        session: SessionConfig,
    ) -> Self {
        Self {
            realtime_url: realtime_url.into(),
            api_key: api_key.into(),
            session,
            settle_delay: Duration::from_millis(crate::config::DEFAULT_SETTLE_DELAY_MS),
            log_event_types: LogEventTypes::default(),
            close_grace: DEFAULT_CLOSE_GRACE,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, ConfigError> {
        let session = SessionConfig {
            turn_detection: Some(TurnDetection::server_vad()),
            input_audio_format: Some(config.audio_format),
            output_audio_format: Some(config.audio_format),
            voice: Some(config.voice.clone()),
            instructions: Some(config.instructions.clone()),
            modalities: Some(vec![Modality::Text, Modality::Audio]),
            temperature: Some(config.temperature),
        };

        Ok(
            Self::new(config.realtime_endpoint()?, config.openai_api_key.clone(), session)
                .with_settle_delay(Duration::from_millis(config.settle_delay_ms))
                .with_log_event_types(config.log_event_types.clone()),
        )
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_log_event_types(mut self, types: LogEventTypes) -> Self {
        self.log_event_types = types;
        self
    }

    pub fn with_close_grace(mut self, grace: Duration) -> Self {
        self.close_grace = grace;
        self
    }

    /// Connection target for the realtime leg, with bearer authentication.
    pub fn ai_target(&self) -> ConnectTarget {
        ConnectTarget::new(self.realtime_url.clone())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("OpenAI-Beta", "realtime=v1")
    }
}

impl fmt::Debug for RelaySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelaySettings")
            .field("realtime_url", &self.realtime_url)
            .field("api_key", &"<redacted>")
            .field("session", &self.session)
            .field("settle_delay", &self.settle_delay)
            .field("log_event_types", &self.log_event_types)
            .field("close_grace", &self.close_grace)
            .finish()
    }
}

impl Drop for RelaySettings {
    fn drop(&mut self) {
        self.api_key.zeroize();
    }
}
