//! Classification of realtime backend events.
//!
//! A pure decision over an event's type tag: forward it as audio, note the
//! session as ready, log it, or ignore it. Which events get logged is the
//! [`LogEventTypes`] allow-list, supplied by configuration.

use std::collections::BTreeSet;

use crate::core::realtime::{AUDIO_DELTA_EVENT, SESSION_UPDATED_EVENT};

use super::control::ControlMessage;

/// Events logged when no allow-list is configured.
pub const DEFAULT_LOG_EVENT_TYPES: &[&str] = &[
    "response.content.done",
    "rate_limits.updated",
    "response.done",
    "input_audio_buffer.committed",
    "input_audio_buffer.speech_stopped",
    "input_audio_buffer.speech_started",
    "session.created",
];

/// What the relay does with a realtime event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    /// Forward the payload to the caller
    AudioDelta,
    /// Session configuration acknowledged; log only
    SessionReady,
    /// On the allow-list; log verbatim
    Loggable,
    /// Drop silently
    Ignored,
}

/// Allow-list of realtime event types worth logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEventTypes(BTreeSet<String>);

impl LogEventTypes {
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(types.into_iter().map(Into::into).collect())
    }

    /// Parse a comma separated list, skipping blanks.
    pub fn from_csv(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty()),
        )
    }

    pub fn contains(&self, event_type: &str) -> bool {
        self.0.contains(event_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for LogEventTypes {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_EVENT_TYPES.iter().copied())
    }
}

/// Classifier bound to one allow-list.
#[derive(Debug, Clone, Copy)]
pub struct EventClassifier<'a> {
    log_types: &'a LogEventTypes,
}

impl<'a> EventClassifier<'a> {
    pub fn new(log_types: &'a LogEventTypes) -> Self {
        Self { log_types }
    }

    /// Classify by type tag. `has_payload` is whether the event carries a
    /// non-empty audio delta.
    pub fn classify_type(&self, event_type: &str, has_payload: bool) -> EventClass {
        if event_type == AUDIO_DELTA_EVENT && has_payload {
            EventClass::AudioDelta
        } else if event_type == SESSION_UPDATED_EVENT {
            EventClass::SessionReady
        } else if self.log_types.contains(event_type) {
            EventClass::Loggable
        } else {
            EventClass::Ignored
        }
    }

    /// Classify a parsed realtime message.
    pub fn classify(&self, message: &ControlMessage) -> EventClass {
        let has_payload = matches!(message, ControlMessage::AudioDelta { .. });
        self.classify_type(message.name(), has_payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_allow_list_is_enumerable() {
        let types = LogEventTypes::default();
        assert_eq!(types.len(), DEFAULT_LOG_EVENT_TYPES.len());
        for name in DEFAULT_LOG_EVENT_TYPES {
            assert!(types.contains(name), "missing {name}");
        }
        let listed: Vec<&str> = types.iter().collect();
        assert_eq!(listed.len(), 7);
    }

    #[test]
    fn test_every_allow_listed_type_is_loggable() {
        let types = LogEventTypes::default();
        let classifier = EventClassifier::new(&types);
        for name in types.iter() {
            assert_eq!(classifier.classify_type(name, false), EventClass::Loggable);
        }
    }

    #[test]
    fn test_audio_delta_needs_payload() {
        let types = LogEventTypes::default();
        let classifier = EventClassifier::new(&types);
        assert_eq!(
            classifier.classify_type("response.audio.delta", true),
            EventClass::AudioDelta
        );
        assert_eq!(
            classifier.classify_type("response.audio.delta", false),
            EventClass::Ignored
        );
    }

    #[test]
    fn test_session_updated_is_ready_even_if_not_listed() {
        let types = LogEventTypes::new(Vec::<String>::new());
        let classifier = EventClassifier::new(&types);
        assert_eq!(
            classifier.classify_type("session.updated", false),
            EventClass::SessionReady
        );
        assert_eq!(
            classifier.classify_type("session.created", false),
            EventClass::Ignored
        );
    }

    #[test]
    fn test_unknown_types_are_ignored() {
        let types = LogEventTypes::default();
        let classifier = EventClassifier::new(&types);
        for name in ["response.text.delta", "conversation.item.created", "error", ""] {
            assert_eq!(classifier.classify_type(name, false), EventClass::Ignored);
        }
    }

    #[test]
    fn test_allow_list_override() {
        let types = LogEventTypes::from_csv(" error , response.done,,");
        assert_eq!(types.len(), 2);
        let classifier = EventClassifier::new(&types);
        assert_eq!(classifier.classify_type("error", false), EventClass::Loggable);
        assert_eq!(
            classifier.classify_type("session.created", false),
            EventClass::Ignored
        );
    }

    #[test]
    fn test_classify_parsed_messages() {
        let types = LogEventTypes::default();
        let classifier = EventClassifier::new(&types);

        let delta = ControlMessage::AudioDelta {
            payload: "ZZZ=".to_string(),
        };
        assert_eq!(classifier.classify(&delta), EventClass::AudioDelta);

        let ack = ControlMessage::SessionUpdateAck {
            raw: json!({"type": "session.updated"}),
        };
        assert_eq!(classifier.classify(&ack), EventClass::SessionReady);

        let created = ControlMessage::SessionReady {
            raw: json!({"type": "session.created"}),
        };
        assert_eq!(classifier.classify(&created), EventClass::Loggable);

        let other = ControlMessage::LifecycleEvent {
            name: "response.created".to_string(),
            raw: json!({"type": "response.created"}),
        };
        assert_eq!(classifier.classify(&other), EventClass::Ignored);
    }
}
