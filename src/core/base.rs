//! Base types shared by the relay core.
//!
//! Every call has two legs: the telephony leg accepted from the phone
//! provider and the AI leg dialled out to the realtime voice backend.
//! Errors carry the identity of the leg they happened on so that a log
//! line is enough to tell which side of the call failed.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

// =============================================================================
// Legs
// =============================================================================

/// One side of a relayed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Leg {
    /// Media stream opened by the telephony provider
    Telephony,
    /// Connection to the realtime voice backend
    Ai,
}

impl Leg {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Leg::Telephony => "telephony",
            Leg::Ai => "ai",
        }
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised while relaying a call.
///
/// None of these are fatal to the process. The relay engine logs them and
/// either drops the offending message or ends the affected leg.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Send attempted on a leg that has already closed
    #[error("{leg} connection is closed")]
    ConnectionClosed { leg: Leg },

    /// Send attempted before the leg reported open
    #[error("{leg} connection is not open yet")]
    NotReady { leg: Leg },

    /// Inbound message could not be parsed
    #[error("Failed to parse {leg} message: {reason}")]
    ParseError {
        leg: Leg,
        reason: String,
        raw: String,
    },

    /// The realtime backend ended the session
    #[error("Realtime backend closed the session")]
    UpstreamClosed,

    /// Socket-level failure
    #[error("{leg} transport error: {reason}")]
    TransportError { leg: Leg, reason: String },

    /// Outbound message could not be encoded
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Connection target could not be turned into a request
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl RelayError {
    pub(crate) fn parse(leg: Leg, reason: impl fmt::Display, raw: impl Into<String>) -> Self {
        RelayError::ParseError {
            leg,
            reason: reason.to_string(),
            raw: raw.into(),
        }
    }

    pub(crate) fn transport(leg: Leg, reason: impl fmt::Display) -> Self {
        RelayError::TransportError {
            leg,
            reason: reason.to_string(),
        }
    }

    /// Short machine-friendly name used in structured log payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::ConnectionClosed { .. } => "connection_closed",
            RelayError::NotReady { .. } => "not_ready",
            RelayError::ParseError { .. } => "parse_error",
            RelayError::UpstreamClosed => "upstream_closed",
            RelayError::TransportError { .. } => "transport_error",
            RelayError::SerializationError(_) => "serialization_error",
            RelayError::InvalidConfiguration(_) => "invalid_configuration",
        }
    }

    /// Whether the error is a dropped send that the caller may ignore.
    pub fn is_dropped_send(&self) -> bool {
        matches!(
            self,
            RelayError::ConnectionClosed { .. } | RelayError::NotReady { .. }
        )
    }
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;
