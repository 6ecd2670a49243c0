//! Per-call session record.

use std::fmt;

/// Where a call is in its lifecycle. Phases only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionPhase {
    /// Telephony leg accepted, realtime leg not requested yet
    Connecting,
    /// Realtime leg requested, session not configured yet
    AwaitingAiReady,
    /// Session configuration sent
    Active,
    /// One leg is gone; no audio goes to the caller any more
    Closing,
    Closed,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Connecting => "connecting",
            SessionPhase::AwaitingAiReady => "awaiting_ai_ready",
            SessionPhase::Active => "active",
            SessionPhase::Closing => "closing",
            SessionPhase::Closed => "closed",
        }
    }

    /// Whether audio may still be sent toward the caller.
    pub fn accepts_outbound_audio(&self) -> bool {
        *self < SessionPhase::Closing
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message counters for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Caller media forwarded to the realtime backend
    pub media_forwarded: u64,
    /// Audio deltas forwarded to the caller
    pub audio_forwarded: u64,
    /// Sends dropped because a leg was not open
    pub dropped: u64,
    /// Inbound bodies that failed to parse
    pub parse_errors: u64,
}

/// Mutable state of one call, owned by its relay engine.
#[derive(Debug)]
pub struct Session {
    call_id: String,
    stream_id: Option<String>,
    phase: SessionPhase,
    session_update_sent: bool,
    ai_ready: bool,
    markers: Vec<String>,
    pub stats: RelayStats,
}

impl Session {
    pub fn new(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            stream_id: None,
            phase: SessionPhase::Connecting,
            session_update_sent: false,
            ai_ready: false,
            markers: Vec::new(),
            stats: RelayStats::default(),
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Move to `next` if it is later than the current phase.
    pub fn advance(&mut self, next: SessionPhase) -> bool {
        if next > self.phase {
            self.phase = next;
            true
        } else {
            false
        }
    }

    pub fn stream_id(&self) -> Option<&str> {
        self.stream_id.as_deref()
    }

    /// Set the stream identifier. Only the first call has an effect.
    pub fn assign_stream_id(&mut self, stream_id: impl Into<String>) -> bool {
        if self.stream_id.is_some() {
            return false;
        }
        self.stream_id = Some(stream_id.into());
        true
    }

    pub fn session_update_sent(&self) -> bool {
        self.session_update_sent
    }

    /// Record that the session configuration went out. Returns `false` if
    /// it already had.
    pub fn mark_session_update_sent(&mut self) -> bool {
        !std::mem::replace(&mut self.session_update_sent, true)
    }

    /// Whether the backend acknowledged the session configuration.
    pub fn ai_ready(&self) -> bool {
        self.ai_ready
    }

    pub fn mark_ai_ready(&mut self) {
        self.ai_ready = true;
    }

    /// Lifecycle event names seen on the realtime leg, in arrival order.
    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    pub fn record_marker(&mut self, name: impl Into<String>) {
        self.markers.push(name.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_id_is_set_once() {
        let mut session = Session::new("call-1");
        assert_eq!(session.stream_id(), None);
        assert!(session.assign_stream_id("SID123"));
        assert!(!session.assign_stream_id("SID999"));
        assert_eq!(session.stream_id(), Some("SID123"));
    }

    #[test]
    fn test_phases_only_move_forward() {
        let mut session = Session::new("call-1");
        assert_eq!(session.phase(), SessionPhase::Connecting);
        assert!(session.advance(SessionPhase::AwaitingAiReady));
        assert!(session.advance(SessionPhase::Closing));
        assert!(!session.advance(SessionPhase::Active));
        assert_eq!(session.phase(), SessionPhase::Closing);
        assert!(session.advance(SessionPhase::Closed));
        assert!(!session.advance(SessionPhase::Closed));
    }

    #[test]
    fn test_outbound_audio_stops_at_closing() {
        assert!(SessionPhase::AwaitingAiReady.accepts_outbound_audio());
        assert!(SessionPhase::Active.accepts_outbound_audio());
        assert!(!SessionPhase::Closing.accepts_outbound_audio());
        assert!(!SessionPhase::Closed.accepts_outbound_audio());
    }

    #[test]
    fn test_session_update_marked_once() {
        let mut session = Session::new("call-1");
        assert!(!session.session_update_sent());
        assert!(session.mark_session_update_sent());
        assert!(!session.mark_session_update_sent());
        assert!(session.session_update_sent());
    }

    #[test]
    fn test_markers_keep_order() {
        let mut session = Session::new("call-1");
        session.record_marker("session.created");
        session.record_marker("response.done");
        assert_eq!(session.markers(), ["session.created", "response.done"]);
        assert_eq!(session.call_id(), "call-1");
    }
}
