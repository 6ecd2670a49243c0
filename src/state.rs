use std::sync::Arc;

use crate::config::{ConfigError, ServerConfig};
use crate::core::relay::RelaySettings;
use crate::telemetry::{RelayEventSink, TracingSink};

/// Application state shared by every handler.
pub struct AppState {
    pub config: ServerConfig,
    /// Settings every relay instance is started with
    pub relay: Arc<RelaySettings>,
    /// Where relay events go
    pub events: Arc<dyn RelayEventSink>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Arc<Self>, ConfigError> {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    /// Build state that reports relay events to `events` instead of `tracing`.
    pub fn with_sink(
        config: ServerConfig,
        events: Arc<dyn RelayEventSink>,
    ) -> Result<Arc<Self>, ConfigError> {
        let relay = Arc::new(RelaySettings::from_config(&config)?);
        Ok(Arc::new(Self {
            config,
            relay,
            events,
        }))
    }

    /// Host advertised in the call-setup document.
    pub fn public_host<'a>(&'a self, request_host: Option<&'a str>) -> Option<&'a str> {
        self.config.public_host.as_deref().or(request_host)
    }
}
