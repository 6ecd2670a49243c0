//! Telephony media-stream protocol (Twilio-style).

pub mod messages;
pub mod twiml;

pub use messages::{
    InboundMedia, MEDIA_EVENT, OutboundMedia, START_EVENT, STOP_EVENT, StartMetadata,
    TelephonyEnvelope, TelephonyOutbound,
};
pub use twiml::{
    ConnectStreamTwiml, DEFAULT_GREETING, DEFAULT_READY_MESSAGE, MEDIA_STREAM_PATH, escape_xml,
};
