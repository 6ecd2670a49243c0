//! Realtime voice API protocol.
//!
//! The relay talks to one backend: an OpenAI-Realtime-style WebSocket API.
//! Caller audio goes out as `input_audio_buffer.append`, synthesized audio
//! comes back as `response.audio.delta`, and the session is configured
//! once with `session.update`.

pub mod config;
pub mod messages;

pub use config::{
    AudioFormat, DEFAULT_REALTIME_MODEL, Modality, OPENAI_REALTIME_URL, RealtimeVoice,
    TEMPERATURE_RANGE,
};
pub use messages::{
    AUDIO_DELTA_EVENT, ClientEvent, SESSION_CREATED_EVENT, SESSION_UPDATED_EVENT, ServerEventHeader,
    SessionConfig, TurnDetection,
};
