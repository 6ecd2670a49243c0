//! Control messages parsed from either leg.
//!
//! Every raw text frame is turned into one [`ControlMessage`] before the
//! engine acts on it. Parsing never panics; bodies that are not valid JSON
//! or lack their tag field come back as [`RelayError::ParseError`] with the
//! raw text attached.

use serde_json::Value;

use crate::core::base::{Leg, RelayError, RelayResult};
use crate::core::realtime::{
    AUDIO_DELTA_EVENT, SESSION_CREATED_EVENT, SESSION_UPDATED_EVENT, ServerEventHeader,
};
use crate::core::telephony::{MEDIA_EVENT, START_EVENT, STOP_EVENT, TelephonyEnvelope};

/// A parsed message from the telephony or the realtime leg.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    /// Telephony stream started
    Start { stream_id: String },
    /// Caller audio
    Media { payload: String },
    /// Telephony stream stopped
    Stop,
    /// Realtime session opened (`session.created`)
    SessionReady { raw: Value },
    /// Realtime session configuration acknowledged (`session.updated`)
    SessionUpdateAck { raw: Value },
    /// Synthesized audio from the realtime backend
    AudioDelta { payload: String },
    /// Any other realtime event
    LifecycleEvent { name: String, raw: Value },
    /// Telephony event the relay does not act on
    Unknown { name: String },
}

impl ControlMessage {
    /// Parse a text frame received on the telephony leg.
    pub fn from_telephony(text: &str) -> RelayResult<Self> {
        let envelope: TelephonyEnvelope = serde_json::from_str(text)
            .map_err(|e| RelayError::parse(Leg::Telephony, e, text))?;

        match envelope.event.as_str() {
            START_EVENT => match envelope.announced_stream_id() {
                Some(stream_id) => Ok(ControlMessage::Start {
                    stream_id: stream_id.to_string(),
                }),
                None => Err(RelayError::parse(
                    Leg::Telephony,
                    "start message without a streamSid",
                    text,
                )),
            },
            MEDIA_EVENT => match envelope.media {
                Some(media) => Ok(ControlMessage::Media {
                    payload: media.payload,
                }),
                None => Err(RelayError::parse(
                    Leg::Telephony,
                    "media message without a payload",
                    text,
                )),
            },
            STOP_EVENT => Ok(ControlMessage::Stop),
            _ => Ok(ControlMessage::Unknown {
                name: envelope.event,
            }),
        }
    }

    /// Parse a text frame received on the realtime leg.
    pub fn from_realtime(text: &str) -> RelayResult<Self> {
        let raw: Value =
            serde_json::from_str(text).map_err(|e| RelayError::parse(Leg::Ai, e, text))?;
        let header = ServerEventHeader::from_value(&raw)
            .ok_or_else(|| RelayError::parse(Leg::Ai, "event without a string type", text))?;

        if let Some(payload) = header.audio_payload() {
            return Ok(ControlMessage::AudioDelta {
                payload: payload.to_string(),
            });
        }

        Ok(match header.event_type.as_str() {
            SESSION_CREATED_EVENT => ControlMessage::SessionReady { raw },
            SESSION_UPDATED_EVENT => ControlMessage::SessionUpdateAck { raw },
            _ => ControlMessage::LifecycleEvent {
                name: header.event_type,
                raw,
            },
        })
    }

    /// The protocol tag this message was parsed from.
    pub fn name(&self) -> &str {
        match self {
            ControlMessage::Start { .. } => START_EVENT,
            ControlMessage::Media { .. } => MEDIA_EVENT,
            ControlMessage::Stop => STOP_EVENT,
            ControlMessage::SessionReady { .. } => SESSION_CREATED_EVENT,
            ControlMessage::SessionUpdateAck { .. } => SESSION_UPDATED_EVENT,
            ControlMessage::AudioDelta { .. } => AUDIO_DELTA_EVENT,
            ControlMessage::LifecycleEvent { name, .. } | ControlMessage::Unknown { name } => {
                name.as_str()
            }
        }
    }
}
