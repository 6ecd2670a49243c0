//! Connection adapter for one leg of a call.
//!
//! An adapter wraps a single WebSocket and reports what happens on it as a
//! stream of [`AdapterEvent`]s: `Open` once, then one `Message` per received
//! text frame in receipt order, `Error` for anything that went wrong, and
//! finally `Closed` exactly once. Sends go through [`ConnectionAdapter::send`]
//! and are refused with a typed error when the leg is not open.
//!
//! The socket itself is owned by a spawned I/O task. The adapter handle only
//! holds the shared state, the outbound channel and a cancellation token, so
//! it can be cloned freely and closed from any trigger.

use std::fmt::{self, Display};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use bytes::Bytes;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use super::base::{Leg, RelayError, RelayResult};

/// Channel capacity for adapter events and outbound messages.
pub const CHANNEL_BUFFER_SIZE: usize = 1024;

// =============================================================================
// State and Events
// =============================================================================

/// Lifecycle of a single leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    /// Handshake still in progress
    Connecting,
    /// Ready to send and receive
    Open,
    /// Closed by either side; never reopens
    Closed,
}

impl AdapterState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => AdapterState::Connecting,
            1 => AdapterState::Open,
            _ => AdapterState::Closed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            AdapterState::Connecting => 0,
            AdapterState::Open => 1,
            AdapterState::Closed => 2,
        }
    }
}

/// Something that happened on a leg.
#[derive(Debug)]
pub enum AdapterEvent {
    /// The leg is open and accepts sends
    Open,
    /// A text frame was received
    Message(String),
    /// A transport or framing problem; followed by `Closed` if the leg died
    Error(RelayError),
    /// The leg is gone; always the last event
    Closed,
}

// =============================================================================
// Wire Messages
// =============================================================================

/// Transport-neutral view of a received frame.
#[derive(Debug)]
pub enum Frame {
    Text(String),
    Binary(usize),
    Ping(Bytes),
    Close,
    Other,
}

/// Conversion between a WebSocket library's message type and [`Frame`].
///
/// Implemented for the accepted `axum` socket and the outbound
/// `tokio-tungstenite` client so one I/O loop serves both legs.
pub trait WireMessage: Sized + Send + 'static {
    fn text(text: String) -> Self;
    fn pong(payload: Bytes) -> Self;
    fn close() -> Self;
    fn into_frame(self) -> Frame;
}

impl WireMessage for axum::extract::ws::Message {
    fn text(text: String) -> Self {
        Self::Text(text.into())
    }

    fn pong(payload: Bytes) -> Self {
        Self::Pong(payload)
    }

    fn close() -> Self {
        Self::Close(None)
    }

    fn into_frame(self) -> Frame {
        match self {
            Self::Text(text) => Frame::Text(text.as_str().to_owned()),
            Self::Binary(data) => Frame::Binary(data.len()),
            Self::Ping(data) => Frame::Ping(data),
            Self::Pong(_) => Frame::Other,
            Self::Close(_) => Frame::Close,
        }
    }
}

impl WireMessage for tungstenite::Message {
    fn text(text: String) -> Self {
        Self::Text(text.into())
    }

    fn pong(payload: Bytes) -> Self {
        Self::Pong(payload)
    }

    fn close() -> Self {
        Self::Close(None)
    }

    fn into_frame(self) -> Frame {
        match self {
            Self::Text(text) => Frame::Text(text.as_str().to_owned()),
            Self::Binary(data) => Frame::Binary(data.len()),
            Self::Ping(data) => Frame::Ping(data),
            Self::Close(_) => Frame::Close,
            Self::Pong(_) | Self::Frame(_) => Frame::Other,
        }
    }
}

// =============================================================================
// Connect Target
// =============================================================================

/// Endpoint and extra headers for an outbound leg.
#[derive(Clone)]
pub struct ConnectTarget {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl ConnectTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Build the WebSocket upgrade request.
    pub fn into_request(self) -> RelayResult<http::Request<()>> {
        let parsed = Url::parse(&self.url).map_err(|e| {
            RelayError::InvalidConfiguration(format!("invalid url '{}': {e}", self.url))
        })?;
        let host = parsed.host_str().ok_or_else(|| {
            RelayError::InvalidConfiguration(format!("url '{}' has no host", self.url))
        })?;
        let host_header = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        let mut builder = http::Request::builder()
            .uri(self.url.as_str())
            .header("Host", host_header)
            .header(
                "Sec-WebSocket-Key",
                tungstenite::handshake::client::generate_key(),
            )
            .header("Sec-WebSocket-Version", "13")
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket");
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder
            .body(())
            .map_err(|e| RelayError::InvalidConfiguration(e.to_string()))
    }
}

impl fmt::Debug for ConnectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<&str> = self.headers.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("ConnectTarget")
            .field("url", &self.url)
            .field("headers", &headers)
            .finish()
    }
}

// =============================================================================
// Connection Adapter
// =============================================================================

/// State shared between an adapter handle and its I/O task.
#[derive(Clone)]
struct Shared {
    leg: Leg,
    state: Arc<AtomicU8>,
    close_latch: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl Shared {
    fn state(&self) -> AdapterState {
        AdapterState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: AdapterState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// Release path run once by the I/O task when the socket is gone.
    async fn finish(&self, events: &mpsc::Sender<AdapterEvent>) {
        self.close_latch.store(true, Ordering::Release);
        self.set_state(AdapterState::Closed);
        self.shutdown.cancel();
        let _ = events.send(AdapterEvent::Closed).await;
        debug!(leg = %self.leg, "Connection adapter released");
    }
}

/// Handle to one leg of a call.
#[derive(Clone)]
pub struct ConnectionAdapter {
    shared: Shared,
    outbound: mpsc::Sender<String>,
}

impl ConnectionAdapter {
    fn new(leg: Leg, initial: AdapterState) -> (Self, mpsc::Receiver<String>) {
        let (outbound, outbound_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let shared = Shared {
            leg,
            state: Arc::new(AtomicU8::new(initial.as_u8())),
            close_latch: Arc::new(AtomicBool::new(false)),
            shutdown: CancellationToken::new(),
        };
        (Self { shared, outbound }, outbound_rx)
    }

    /// Wrap an already-established socket. The leg is open immediately.
    pub fn accept<S, M, E>(leg: Leg, socket: S) -> (Self, mpsc::Receiver<AdapterEvent>)
    where
        S: Stream<Item = Result<M, E>> + Sink<M> + Send + Unpin + 'static,
        <S as Sink<M>>::Error: Display + Send,
        M: WireMessage,
        E: Display + Send + 'static,
    {
        let (adapter, outbound_rx) = Self::new(leg, AdapterState::Open);
        let (events_tx, events_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let shared = adapter.shared.clone();

        tokio::spawn(async move {
            let _ = events_tx.send(AdapterEvent::Open).await;
            drive(shared, socket, outbound_rx, events_tx).await;
        });

        (adapter, events_rx)
    }

    /// Dial out to `target`. The leg opens when the handshake completes.
    pub fn connect(leg: Leg, target: ConnectTarget) -> (Self, mpsc::Receiver<AdapterEvent>) {
        let (adapter, outbound_rx) = Self::new(leg, AdapterState::Connecting);
        let (events_tx, events_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let shared = adapter.shared.clone();

        tokio::spawn(async move {
            let request = match target.into_request() {
                Ok(request) => request,
                Err(e) => {
                    let _ = events_tx.send(AdapterEvent::Error(e)).await;
                    shared.finish(&events_tx).await;
                    return;
                }
            };

            let handshake = tokio::select! {
                _ = shared.shutdown.cancelled() => None,
                result = tokio_tungstenite::connect_async(request) => Some(result),
            };

            match handshake {
                Some(Ok((mut ws_stream, _response))) => {
                    let opened = shared.state.compare_exchange(
                        AdapterState::Connecting.as_u8(),
                        AdapterState::Open.as_u8(),
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    );
                    if opened.is_err() {
                        // close() won the race with the handshake
                        let _ = ws_stream.close(None).await;
                        shared.finish(&events_tx).await;
                        return;
                    }
                    let _ = events_tx.send(AdapterEvent::Open).await;
                    drive(shared, ws_stream, outbound_rx, events_tx).await;
                }
                Some(Err(e)) => {
                    let _ = events_tx
                        .send(AdapterEvent::Error(RelayError::transport(leg, e)))
                        .await;
                    shared.finish(&events_tx).await;
                }
                None => shared.finish(&events_tx).await,
            }
        });

        (adapter, events_rx)
    }

    pub fn leg(&self) -> Leg {
        self.shared.leg
    }

    pub fn state(&self) -> AdapterState {
        self.shared.state()
    }

    pub fn is_open(&self) -> bool {
        self.state() == AdapterState::Open
    }

    /// Queue a text frame for transmission.
    pub async fn send(&self, text: String) -> RelayResult<()> {
        let leg = self.shared.leg;
        match self.state() {
            AdapterState::Connecting => Err(RelayError::NotReady { leg }),
            AdapterState::Closed => Err(RelayError::ConnectionClosed { leg }),
            AdapterState::Open => self
                .outbound
                .send(text)
                .await
                .map_err(|_| RelayError::ConnectionClosed { leg }),
        }
    }

    /// Serialize `message` as JSON and queue it.
    pub async fn send_json<T: Serialize>(&self, message: &T) -> RelayResult<()> {
        let text = serde_json::to_string(message)
            .map_err(|e| RelayError::SerializationError(e.to_string()))?;
        self.send(text).await
    }

    /// Close the leg. Returns `true` only for the call that initiated the
    /// release; later calls, or calls after the peer closed, are no-ops.
    pub fn close(&self) -> bool {
        if self.shared.close_latch.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.shared.set_state(AdapterState::Closed);
        self.shared.shutdown.cancel();
        true
    }
}

impl fmt::Debug for ConnectionAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionAdapter")
            .field("leg", &self.shared.leg)
            .field("state", &self.state())
            .finish()
    }
}

/// I/O loop owning the socket until either side closes it.
async fn drive<S, M, E>(
    shared: Shared,
    socket: S,
    mut outbound: mpsc::Receiver<String>,
    events: mpsc::Sender<AdapterEvent>,
) where
    S: Stream<Item = Result<M, E>> + Sink<M> + Send + Unpin + 'static,
    <S as Sink<M>>::Error: Display + Send,
    M: WireMessage,
    E: Display + Send + 'static,
{
    let leg = shared.leg;
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            biased;

            _ = shared.shutdown.cancelled() => {
                if let Err(e) = sink.send(M::close()).await {
                    debug!(leg = %leg, "Close frame not delivered: {}", e);
                }
                break;
            }

            Some(text) = outbound.recv() => {
                if let Err(e) = sink.send(M::text(text)).await {
                    let _ = events
                        .send(AdapterEvent::Error(RelayError::transport(leg, e)))
                        .await;
                    break;
                }
            }

            msg = stream.next() => match msg {
                Some(Ok(msg)) => match msg.into_frame() {
                    Frame::Text(text) => {
                        if events.send(AdapterEvent::Message(text)).await.is_err() {
                            // Nobody is listening any more
                            break;
                        }
                    }
                    Frame::Binary(len) => {
                        let _ = events
                            .send(AdapterEvent::Error(RelayError::parse(
                                leg,
                                "binary frames are not part of the protocol",
                                format!("<{len} binary bytes>"),
                            )))
                            .await;
                    }
                    Frame::Ping(payload) => {
                        if let Err(e) = sink.send(M::pong(payload)).await {
                            debug!(leg = %leg, "Failed to send pong: {}", e);
                        }
                    }
                    Frame::Close => break,
                    Frame::Other => {}
                },
                Some(Err(e)) => {
                    let _ = events
                        .send(AdapterEvent::Error(RelayError::transport(leg, e)))
                        .await;
                    break;
                }
                None => break,
            }
        }
    }

    shared.finish(&events).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::duplex;
    use tokio_tungstenite::WebSocketStream;
    use tokio_tungstenite::tungstenite::protocol::Role;

    async fn ws_pair() -> (
        WebSocketStream<tokio::io::DuplexStream>,
        WebSocketStream<tokio::io::DuplexStream>,
    ) {
        let (a, b) = duplex(64 * 1024);
        let server = WebSocketStream::from_raw_socket(a, Role::Server, None).await;
        let client = WebSocketStream::from_raw_socket(b, Role::Client, None).await;
        (server, client)
    }

    async fn next_event(rx: &mut mpsc::Receiver<AdapterEvent>) -> AdapterEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for adapter event")
            .expect("event channel closed")
    }

    #[tokio::test]
    async fn test_accept_reports_open_then_messages_in_order() {
        let (server, mut peer) = ws_pair().await;
        let (adapter, mut events) = ConnectionAdapter::accept(Leg::Telephony, server);
        assert!(adapter.is_open());
        assert!(matches!(next_event(&mut events).await, AdapterEvent::Open));

        peer.send(tungstenite::Message::text("one")).await.unwrap();
        peer.send(tungstenite::Message::text("two")).await.unwrap();

        match next_event(&mut events).await {
            AdapterEvent::Message(text) => assert_eq!(text, "one"),
            other => panic!("unexpected event: {other:?}"),
        }
        match next_event(&mut events).await {
            AdapterEvent::Message(text) => assert_eq!(text, "two"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_reaches_peer() {
        let (server, mut peer) = ws_pair().await;
        let (adapter, _events) = ConnectionAdapter::accept(Leg::Ai, server);

        adapter.send("hello".to_string()).await.unwrap();

        let received = tokio::time::timeout(Duration::from_secs(2), peer.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(received.into_text().unwrap().as_str(), "hello");
    }

    #[tokio::test]
    async fn test_close_runs_once_and_refuses_sends() {
        let (server, _peer) = ws_pair().await;
        let (adapter, mut events) = ConnectionAdapter::accept(Leg::Ai, server);
        assert!(matches!(next_event(&mut events).await, AdapterEvent::Open));

        assert!(adapter.close());
        assert!(!adapter.close());
        assert!(!adapter.clone().close());
        assert_eq!(adapter.state(), AdapterState::Closed);

        assert!(matches!(next_event(&mut events).await, AdapterEvent::Closed));
        let err = adapter.send("late".to_string()).await.unwrap_err();
        assert!(matches!(err, RelayError::ConnectionClosed { leg: Leg::Ai }));
    }

    #[tokio::test]
    async fn test_peer_close_emits_closed_and_latches() {
        let (server, mut peer) = ws_pair().await;
        let (adapter, mut events) = ConnectionAdapter::accept(Leg::Telephony, server);
        assert!(matches!(next_event(&mut events).await, AdapterEvent::Open));

        peer.close(None).await.unwrap();

        assert!(matches!(next_event(&mut events).await, AdapterEvent::Closed));
        assert_eq!(adapter.state(), AdapterState::Closed);
        // The peer already released the socket
        assert!(!adapter.close());
    }

    #[tokio::test]
    async fn test_binary_frame_is_reported_not_fatal() {
        let (server, mut peer) = ws_pair().await;
        let (adapter, mut events) = ConnectionAdapter::accept(Leg::Telephony, server);
        assert!(matches!(next_event(&mut events).await, AdapterEvent::Open));

        peer.send(tungstenite::Message::binary(vec![1u8, 2, 3]))
            .await
            .unwrap();
        match next_event(&mut events).await {
            AdapterEvent::Error(RelayError::ParseError { raw, .. }) => {
                assert_eq!(raw, "<3 binary bytes>")
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(adapter.is_open());
    }

    #[tokio::test]
    async fn test_connect_to_unreachable_target_fails_cleanly() {
        // Port 9 on localhost is the discard service; nothing listens there in CI.
        let target = ConnectTarget::new("ws://127.0.0.1:9/realtime");
        let (adapter, mut events) = ConnectionAdapter::connect(Leg::Ai, target);

        let err = adapter.send("early".to_string()).await;
        assert!(matches!(
            err,
            Err(RelayError::NotReady { .. }) | Err(RelayError::ConnectionClosed { .. })
        ));

        assert!(matches!(
            next_event(&mut events).await,
            AdapterEvent::Error(RelayError::TransportError { leg: Leg::Ai, .. })
        ));
        assert!(matches!(next_event(&mut events).await, AdapterEvent::Closed));
        assert_eq!(adapter.state(), AdapterState::Closed);
    }

    #[tokio::test]
    async fn test_invalid_target_reports_configuration_error() {
        let (_adapter, mut events) =
            ConnectionAdapter::connect(Leg::Ai, ConnectTarget::new("not a url"));
        assert!(matches!(
            next_event(&mut events).await,
            AdapterEvent::Error(RelayError::InvalidConfiguration(_))
        ));
        assert!(matches!(next_event(&mut events).await, AdapterEvent::Closed));
    }

    #[test]
    fn test_connect_target_request_headers() {
        let request = ConnectTarget::new("wss://api.example.com/v1/realtime?model=m")
            .header("Authorization", "Bearer secret")
            .header("OpenAI-Beta", "realtime=v1")
            .into_request()
            .unwrap();

        assert_eq!(request.headers()["Host"], "api.example.com");
        assert_eq!(request.headers()["Authorization"], "Bearer secret");
        assert_eq!(request.headers()["OpenAI-Beta"], "realtime=v1");
        assert_eq!(request.uri().query(), Some("model=m"));
    }

    #[test]
    fn test_connect_target_debug_hides_header_values() {
        let target = ConnectTarget::new("ws://localhost:1").header("Authorization", "Bearer secret");
        let debug = format!("{target:?}");
        assert!(debug.contains("Authorization"));
        assert!(!debug.contains("secret"));
    }
}
