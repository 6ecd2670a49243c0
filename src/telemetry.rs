//! Structured relay events.
//!
//! The relay core never formats log lines itself. It emits [`RelayEvent`]s
//! into a [`RelayEventSink`]; the server wires in [`TracingSink`], tests use
//! [`MemorySink`] to assert on what happened during a call.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// How important an event is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

/// What part of the call an event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Call setup and teardown
    Lifecycle,
    /// Control events from the telephony provider
    Telephony,
    /// Allow-listed events from the realtime backend
    Realtime,
    /// Audio or session messages sent to either leg
    Forwarding,
    /// Something went wrong on a leg
    Error,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Lifecycle => "lifecycle",
            EventCategory::Telephony => "telephony",
            EventCategory::Realtime => "realtime",
            EventCategory::Forwarding => "forwarding",
            EventCategory::Error => "error",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observable occurrence during a call.
#[derive(Debug, Clone, Serialize)]
pub struct RelayEvent {
    pub severity: Severity,
    pub category: EventCategory,
    pub call_id: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// Destination for relay events.
pub trait RelayEventSink: Send + Sync {
    fn emit(&self, event: RelayEvent);
}

/// Sink that forwards events to `tracing` at the matching level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl RelayEventSink for TracingSink {
    fn emit(&self, event: RelayEvent) {
        let payload = event
            .payload
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_default();
        let call_id = event.call_id.as_str();
        let category = event.category.as_str();

        match event.severity {
            Severity::Debug => debug!(call_id, category, payload = %payload, "{}", event.message),
            Severity::Info => info!(call_id, category, payload = %payload, "{}", event.message),
            Severity::Warn => warn!(call_id, category, payload = %payload, "{}", event.message),
            Severity::Error => error!(call_id, category, payload = %payload, "{}", event.message),
        }
    }
}

/// Sink that keeps every event in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<RelayEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RelayEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Events at `severity` or above.
    pub fn at_least(&self, severity: Severity) -> Vec<RelayEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.severity >= severity)
            .cloned()
            .collect()
    }

    pub fn in_category(&self, category: EventCategory) -> Vec<RelayEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.category == category)
            .cloned()
            .collect()
    }

    pub fn contains_message(&self, needle: &str) -> bool {
        self.events
            .lock()
            .iter()
            .any(|event| event.message.contains(needle))
    }
}

impl RelayEventSink for MemorySink {
    fn emit(&self, event: RelayEvent) {
        self.events.lock().push(event);
    }
}
