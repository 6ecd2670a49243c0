//! Telephony media-stream message types.
//!
//! The provider sends JSON objects tagged by a string `event` field:
//! `connected`, `start`, `media`, `mark`, `stop`. Only `start` and `media`
//! carry data the relay needs. Outbound, the relay only ever sends `media`.

use serde::{Deserialize, Serialize};

pub const START_EVENT: &str = "start";
pub const MEDIA_EVENT: &str = "media";
pub const STOP_EVENT: &str = "stop";

// =============================================================================
// Inbound
// =============================================================================

/// An inbound telephony message with every optional section the relay reads.
#[derive(Debug, Clone, Deserialize)]
pub struct TelephonyEnvelope {
    pub event: String,

    /// Present on most events after `start`
    #[serde(rename = "streamSid", default)]
    pub stream_sid: Option<String>,

    #[serde(default)]
    pub start: Option<StartMetadata>,

    #[serde(default)]
    pub media: Option<InboundMedia>,
}

impl TelephonyEnvelope {
    /// Stream identifier announced by a `start` message.
    ///
    /// `start.streamSid` wins; the top-level `streamSid` is the fallback.
    pub fn announced_stream_id(&self) -> Option<&str> {
        self.start
            .as_ref()
            .and_then(|start| start.stream_sid.as_deref())
            .or(self.stream_sid.as_deref())
            .filter(|sid| !sid.is_empty())
    }
}

/// The `start` section of a `start` message.
#[derive(Debug, Clone, Deserialize)]
pub struct StartMetadata {
    #[serde(rename = "streamSid", default)]
    pub stream_sid: Option<String>,

    #[serde(rename = "callSid", default)]
    pub call_sid: Option<String>,
}

/// The `media` section of an inbound `media` message.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMedia {
    /// Base64 audio in the negotiated codec
    pub payload: String,

    #[serde(default)]
    pub track: Option<String>,
}

// =============================================================================
// Outbound
// =============================================================================

/// Messages the relay sends to the telephony provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyOutbound {
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutboundMedia,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMedia {
    pub payload: String,
}

impl TelephonyOutbound {
    pub fn media(stream_sid: impl Into<String>, payload: impl Into<String>) -> Self {
        TelephonyOutbound::Media {
            stream_sid: stream_sid.into(),
            media: OutboundMedia {
                payload: payload.into(),
            },
        }
    }
}
