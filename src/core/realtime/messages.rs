//! Realtime voice API WebSocket message types.
//!
//! Only the subset the relay speaks is modelled:
//!
//! Client events (sent to the backend):
//! - session.update - configure codec, voice, instructions and turn detection
//! - input_audio_buffer.append - append caller audio
//!
//! Server events are read through [`ServerEventHeader`], which keeps the
//! `type` tag and the optional audio `delta`. Everything else in the body is
//! passed through untouched so it can be logged verbatim.

use serde::{Deserialize, Serialize};

use super::config::{AudioFormat, Modality};

/// Server event carrying synthesized audio.
pub const AUDIO_DELTA_EVENT: &str = "response.audio.delta";
/// Server event created when the backend opens a session.
pub const SESSION_CREATED_EVENT: &str = "session.created";
/// Server event acknowledging a `session.update`.
pub const SESSION_UPDATED_EVENT: &str = "session.updated";

// =============================================================================
// Session Configuration
// =============================================================================

/// Session configuration sent in `session.update`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Turn detection configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_format: Option<AudioFormat>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_format: Option<AudioFormat>,

    /// Voice for audio output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// System instructions for the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Response modalities (text, audio)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<Modality>>,

    /// Temperature for response generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// Turn detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Server-side VAD
    #[serde(rename = "server_vad")]
    ServerVad {
        #[serde(skip_serializing_if = "Option::is_none")]
        threshold: Option<f32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        prefix_padding_ms: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        silence_duration_ms: Option<u32>,
    },
    /// No turn detection
    #[serde(rename = "none")]
    None {},
}

impl TurnDetection {
    /// Server VAD with the backend's own thresholds.
    pub fn server_vad() -> Self {
        TurnDetection::ServerVad {
            threshold: None,
            prefix_padding_ms: None,
            silence_duration_ms: None,
        }
    }
}

// =============================================================================
// Client Events (sent to server)
// =============================================================================

/// Client events sent to the realtime API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionConfig },

    /// Append audio to input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64-encoded audio, passed through from the caller unchanged
        audio: String,
    },
}

impl ClientEvent {
    pub fn audio_append(payload: impl Into<String>) -> Self {
        ClientEvent::InputAudioBufferAppend {
            audio: payload.into(),
        }
    }
}

// =============================================================================
// Server Events (received from server)
// =============================================================================

/// The fields of a server event the relay acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEventHeader {
    pub event_type: String,

    /// Base64 audio on `response.audio.delta`
    pub delta: Option<String>,
}

impl ServerEventHeader {
    /// Read the header out of a decoded event body.
    ///
    /// Returns `None` when the body is not an object with a string `type`.
    /// A `delta` that is not a string is treated as absent.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        let event_type = value.get("type")?.as_str()?.to_string();
        let delta = value
            .get("delta")
            .and_then(|delta| delta.as_str())
            .map(str::to_string);
        Some(Self { event_type, delta })
    }

    /// Audio payload of an audio delta event, if it carries a non-empty one.
    pub fn audio_payload(&self) -> Option<&str> {
        if self.event_type != AUDIO_DELTA_EVENT {
            return None;
        }
        self.delta.as_deref().filter(|delta| !delta.is_empty())
    }
}
