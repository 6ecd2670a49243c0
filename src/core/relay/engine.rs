//! Per-call relay engine.
//!
//! One engine runs per accepted telephony connection. It owns both adapters
//! and the [`Session`], and is the only place where messages cross from one
//! leg to the other:
//!
//! ```text
//! telephony ──media──▶ engine ──input_audio_buffer.append──▶ realtime
//! telephony ◀──media── engine ◀──response.audio.delta─────── realtime
//! ```
//!
//! The engine loop is a single task selecting over both adapters' event
//! channels and the settle timer, so all session state is touched from one
//! place and needs no locking.

use std::fmt::Display;
use std::sync::Arc;

use futures_util::{Sink, Stream};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};

use crate::core::adapter::{AdapterEvent, ConnectionAdapter, WireMessage};
use crate::core::base::{Leg, RelayError};
use crate::core::realtime::ClientEvent;
use crate::core::telephony::TelephonyOutbound;
use crate::telemetry::{EventCategory, RelayEvent, RelayEventSink, Severity};

use super::classifier::{EventClass, EventClassifier};
use super::control::ControlMessage;
use super::session::{Session, SessionPhase};
use super::settings::RelaySettings;

/// Relay engine for one call.
pub struct RelayEngine {
    settings: Arc<RelaySettings>,
    sink: Arc<dyn RelayEventSink>,
    session: Session,
    telephony: ConnectionAdapter,
    ai: ConnectionAdapter,
}

impl RelayEngine {
    pub fn new(
        call_id: impl Into<String>,
        settings: Arc<RelaySettings>,
        sink: Arc<dyn RelayEventSink>,
        telephony: ConnectionAdapter,
        ai: ConnectionAdapter,
    ) -> Self {
        Self {
            settings,
            sink,
            session: Session::new(call_id),
            telephony,
            ai,
        }
    }

    /// Drive the call until the telephony leg closes. Returns the final
    /// session record.
    pub async fn run(
        mut self,
        mut telephony_events: mpsc::Receiver<AdapterEvent>,
        mut ai_events: mpsc::Receiver<AdapterEvent>,
    ) -> Session {
        self.session.advance(SessionPhase::AwaitingAiReady);
        self.emit(
            Severity::Info,
            EventCategory::Lifecycle,
            "Client connected",
            None,
        );

        let settle = sleep(self.settings.settle_delay);
        tokio::pin!(settle);
        let mut settle_armed = false;
        let mut ai_done = false;

        loop {
            tokio::select! {
                event = telephony_events.recv() => match event {
                    Some(AdapterEvent::Open) => {}
                    Some(AdapterEvent::Message(text)) => self.on_telephony_message(&text).await,
                    Some(AdapterEvent::Error(e)) => self.on_adapter_error(e),
                    Some(AdapterEvent::Closed) | None => break,
                },

                event = ai_events.recv(), if !ai_done => match event {
                    Some(AdapterEvent::Open) => {
                        self.emit(
                            Severity::Info,
                            EventCategory::Lifecycle,
                            "Connected to the realtime API",
                            None,
                        );
                        settle.as_mut().reset(Instant::now() + self.settings.settle_delay);
                        settle_armed = true;
                    }
                    Some(AdapterEvent::Message(text)) => self.on_ai_message(&text).await,
                    Some(AdapterEvent::Error(e)) => self.on_adapter_error(e),
                    Some(AdapterEvent::Closed) | None => {
                        ai_done = true;
                        settle_armed = false;
                        self.on_ai_closed();
                    }
                },

                _ = &mut settle, if settle_armed => {
                    settle_armed = false;
                    self.send_session_update().await;
                }
            }
        }

        self.shutdown(ai_events, ai_done).await;
        self.session
    }

    async fn on_telephony_message(&mut self, text: &str) {
        let message = match ControlMessage::from_telephony(text) {
            Ok(message) => message,
            Err(e) => return self.on_parse_error(e),
        };

        match message {
            ControlMessage::Media { payload } => {
                match self.ai.send_json(&ClientEvent::audio_append(payload)).await {
                    Ok(()) => self.session.stats.media_forwarded += 1,
                    Err(e) => self.on_send_error(e),
                }
            }
            ControlMessage::Start { stream_id } => {
                if self.session.assign_stream_id(stream_id.as_str()) {
                    self.emit(
                        Severity::Info,
                        EventCategory::Telephony,
                        "Incoming stream has started",
                        Some(json!({ "streamSid": stream_id })),
                    );
                } else {
                    self.emit(
                        Severity::Warn,
                        EventCategory::Telephony,
                        "Ignoring repeated start message",
                        Some(json!({
                            "streamSid": self.session.stream_id(),
                            "ignored": stream_id,
                        })),
                    );
                }
            }
            other => {
                self.emit(
                    Severity::Info,
                    EventCategory::Telephony,
                    format!("Received non-media event: {}", other.name()),
                    None,
                );
            }
        }
    }

    async fn on_ai_message(&mut self, text: &str) {
        let message = match ControlMessage::from_realtime(text) {
            Ok(message) => message,
            Err(e) => return self.on_parse_error(e),
        };

        let class = EventClassifier::new(&self.settings.log_event_types).classify(&message);
        match (class, message) {
            (EventClass::AudioDelta, ControlMessage::AudioDelta { payload }) => {
                self.forward_audio_delta(payload).await
            }
            (EventClass::SessionReady, message) => {
                self.session.mark_ai_ready();
                self.emit(
                    Severity::Info,
                    EventCategory::Realtime,
                    "Session updated successfully",
                    raw_body(message),
                );
            }
            (EventClass::Loggable, message) => {
                let name = message.name().to_string();
                self.session.record_marker(name.as_str());
                self.emit(
                    Severity::Info,
                    EventCategory::Realtime,
                    format!("Received event: {name}"),
                    raw_body(message),
                );
            }
            _ => {}
        }
    }

    async fn forward_audio_delta(&mut self, payload: String) {
        if !self.session.phase().accepts_outbound_audio() {
            self.session.stats.dropped += 1;
            return;
        }
        let Some(stream_id) = self.session.stream_id() else {
            self.session.stats.dropped += 1;
            self.emit(
                Severity::Warn,
                EventCategory::Forwarding,
                "Dropping audio delta received before the stream started",
                None,
            );
            return;
        };

        let outbound = TelephonyOutbound::media(stream_id, payload);
        match self.telephony.send_json(&outbound).await {
            Ok(()) => self.session.stats.audio_forwarded += 1,
            Err(e) => self.on_send_error(e),
        }
    }

    async fn send_session_update(&mut self) {
        if !self.session.mark_session_update_sent() {
            return;
        }

        let update = ClientEvent::SessionUpdate {
            session: self.settings.session.clone(),
        };
        let payload = serde_json::to_value(&update).ok();
        match self.ai.send_json(&update).await {
            Ok(()) => {
                self.session.advance(SessionPhase::Active);
                self.emit(
                    Severity::Info,
                    EventCategory::Forwarding,
                    "Sending session update",
                    payload,
                );
            }
            Err(e) => self.emit(
                Severity::Error,
                EventCategory::Error,
                format!("Failed to send session update: {e}"),
                Some(error_payload(&e)),
            ),
        }
    }

    fn on_ai_closed(&mut self) {
        self.session.advance(SessionPhase::Closing);
        let e = RelayError::UpstreamClosed;
        self.emit(
            Severity::Warn,
            EventCategory::Lifecycle,
            "Disconnected from the realtime API",
            Some(error_payload(&e)),
        );
    }

    fn on_parse_error(&mut self, e: RelayError) {
        self.session.stats.parse_errors += 1;
        self.emit(
            Severity::Warn,
            EventCategory::Error,
            format!("Error processing message: {e}"),
            Some(error_payload(&e)),
        );
    }

    fn on_send_error(&mut self, e: RelayError) {
        if e.is_dropped_send() {
            self.session.stats.dropped += 1;
            self.emit(
                Severity::Debug,
                EventCategory::Forwarding,
                format!("Dropped message: {e}"),
                None,
            );
        } else {
            self.emit(
                Severity::Error,
                EventCategory::Error,
                format!("Failed to forward message: {e}"),
                Some(error_payload(&e)),
            );
        }
    }

    fn on_adapter_error(&mut self, e: RelayError) {
        if matches!(e, RelayError::ParseError { .. }) {
            return self.on_parse_error(e);
        }
        self.emit(
            Severity::Error,
            EventCategory::Error,
            e.to_string(),
            Some(error_payload(&e)),
        );
    }

    /// Telephony leg is gone: release the realtime leg and finish.
    async fn shutdown(&mut self, mut ai_events: mpsc::Receiver<AdapterEvent>, ai_done: bool) {
        self.session.advance(SessionPhase::Closing);
        self.emit(
            Severity::Info,
            EventCategory::Lifecycle,
            "Client disconnected",
            None,
        );

        if !ai_done {
            self.ai.close();
            let drained = tokio::time::timeout(self.settings.close_grace, async {
                while let Some(event) = ai_events.recv().await {
                    if matches!(event, AdapterEvent::Closed) {
                        break;
                    }
                }
            })
            .await;
            if drained.is_err() {
                self.emit(
                    Severity::Warn,
                    EventCategory::Lifecycle,
                    "Realtime connection did not close in time",
                    None,
                );
            }
        }

        self.telephony.close();
        self.session.advance(SessionPhase::Closed);
        self.emit(
            Severity::Info,
            EventCategory::Lifecycle,
            "Call ended",
            Some(json!({
                "streamSid": self.session.stream_id(),
                "media_forwarded": self.session.stats.media_forwarded,
                "audio_forwarded": self.session.stats.audio_forwarded,
                "dropped": self.session.stats.dropped,
                "parse_errors": self.session.stats.parse_errors,
            })),
        );
    }

    fn emit(
        &self,
        severity: Severity,
        category: EventCategory,
        message: impl Into<String>,
        payload: Option<Value>,
    ) {
        self.sink.emit(RelayEvent {
            severity,
            category,
            call_id: self.session.call_id().to_string(),
            message: message.into(),
            payload,
        });
    }
}

fn raw_body(message: ControlMessage) -> Option<Value> {
    match message {
        ControlMessage::SessionReady { raw }
        | ControlMessage::SessionUpdateAck { raw }
        | ControlMessage::LifecycleEvent { raw, .. } => Some(raw),
        _ => None,
    }
}

fn error_payload(e: &RelayError) -> Value {
    let mut payload = json!({ "kind": e.kind(), "error": e.to_string() });
    match e {
        RelayError::ParseError { leg, raw, .. } => {
            payload["leg"] = json!(leg);
            payload["raw"] = json!(raw);
        }
        RelayError::ConnectionClosed { leg }
        | RelayError::NotReady { leg }
        | RelayError::TransportError { leg, .. } => payload["leg"] = json!(leg),
        RelayError::UpstreamClosed => payload["leg"] = json!(Leg::Ai),
        RelayError::SerializationError(_) | RelayError::InvalidConfiguration(_) => {}
    }
    payload
}

/// Relay one call: accept the telephony socket, dial the realtime backend
/// and run the engine until the caller hangs up.
pub async fn relay_call<S, M, E>(
    call_id: impl Into<String>,
    settings: Arc<RelaySettings>,
    sink: Arc<dyn RelayEventSink>,
    socket: S,
) -> Session
where
    S: Stream<Item = Result<M, E>> + Sink<M> + Send + Unpin + 'static,
    <S as Sink<M>>::Error: Display + Send,
    M: WireMessage,
    E: Display + Send + 'static,
{
    let (telephony, telephony_events) = ConnectionAdapter::accept(Leg::Telephony, socket);
    let (ai, ai_events) = ConnectionAdapter::connect(Leg::Ai, settings.ai_target());
    RelayEngine::new(call_id, settings, sink, telephony, ai)
        .run(telephony_events, ai_events)
        .await
}
