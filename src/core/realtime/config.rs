//! Realtime voice API configuration types.
//!
//! Endpoint, model and voice defaults plus the audio formats the API
//! negotiates. Telephony media is G.711 u-law at 8 kHz, so that is the
//! default format in both directions.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Realtime API WebSocket endpoint.
pub const OPENAI_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

/// Model requested when none is configured.
pub const DEFAULT_REALTIME_MODEL: &str = "gpt-4o-realtime-preview-2024-10-01";

/// Sampling temperature range accepted by the realtime API.
pub const TEMPERATURE_RANGE: std::ops::RangeInclusive<f64> = 0.6..=1.2;

// =============================================================================
// Voices
// =============================================================================

/// Voices the realtime API is known to offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RealtimeVoice {
    Alloy,
    Ash,
    Ballad,
    Coral,
    Echo,
    Sage,
    #[default]
    Shimmer,
    Verse,
}

impl RealtimeVoice {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alloy => "alloy",
            Self::Ash => "ash",
            Self::Ballad => "ballad",
            Self::Coral => "coral",
            Self::Echo => "echo",
            Self::Sage => "sage",
            Self::Shimmer => "shimmer",
            Self::Verse => "verse",
        }
    }

    pub fn all() -> &'static [RealtimeVoice] {
        &[
            Self::Alloy,
            Self::Ash,
            Self::Ballad,
            Self::Coral,
            Self::Echo,
            Self::Sage,
            Self::Shimmer,
            Self::Verse,
        ]
    }

    /// Whether `name` matches one of the known voices, ignoring case.
    pub fn is_known(name: &str) -> bool {
        Self::all()
            .iter()
            .any(|voice| voice.as_str().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for RealtimeVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Audio Formats
// =============================================================================

/// Audio encodings the realtime API accepts for input and output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AudioFormat {
    /// PCM 16-bit signed little-endian, 24 kHz
    #[serde(rename = "pcm16")]
    Pcm16,
    /// G.711 u-law, 8 kHz (telephony default)
    #[default]
    #[serde(rename = "g711_ulaw")]
    G711Ulaw,
    /// G.711 a-law, 8 kHz
    #[serde(rename = "g711_alaw")]
    G711Alaw,
}

impl AudioFormat {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pcm16 => "pcm16",
            Self::G711Ulaw => "g711_ulaw",
            Self::G711Alaw => "g711_alaw",
        }
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        match self {
            Self::Pcm16 => 24000,
            Self::G711Ulaw | Self::G711Alaw => 8000,
        }
    }
}

impl FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pcm16" | "pcm" | "linear16" => Ok(Self::Pcm16),
            "g711_ulaw" | "ulaw" | "mulaw" => Ok(Self::G711Ulaw),
            "g711_alaw" | "alaw" => Ok(Self::G711Alaw),
            other => Err(format!("unsupported audio format '{other}'")),
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Modalities
// =============================================================================

/// Response modalities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Audio,
}
