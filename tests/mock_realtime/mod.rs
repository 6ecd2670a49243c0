//! Mock realtime backend
//!
//! Accepts a single WebSocket connection on `127.0.0.1:0`, records the
//! handshake, reports every JSON message the relay sends and lets the test
//! push server events back.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

const WAIT: Duration = Duration::from_secs(5);

/// Handshake details captured from the relay's connection
#[derive(Debug, Clone)]
pub struct Handshake {
    pub uri: String,
    /// Header names are lowercase
    pub headers: HashMap<String, String>,
}

pub enum MockCommand {
    Send(Value),
    Close,
}

pub struct MockRealtime {
    pub addr: SocketAddr,
    handshake: Option<oneshot::Receiver<Handshake>>,
    received: mpsc::UnboundedReceiver<Value>,
    commands: mpsc::UnboundedSender<MockCommand>,
}

impl MockRealtime {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (handshake_tx, handshake_rx) = oneshot::channel();
        let (received_tx, received_rx) = mpsc::unbounded_channel();
        let (commands_tx, mut commands_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };

            let callback = move |request: &Request, response: Response| {
                let headers = request
                    .headers()
                    .iter()
                    .map(|(name, value)| {
                        (
                            name.as_str().to_string(),
                            value.to_str().unwrap_or_default().to_string(),
                        )
                    })
                    .collect();
                let _ = handshake_tx.send(Handshake {
                    uri: request.uri().to_string(),
                    headers,
                });
                Ok::<Response, ErrorResponse>(response)
            };

            let Ok(ws_stream) = accept_hdr_async(stream, callback).await else {
                return;
            };
            let (mut write, mut read) = ws_stream.split();

            loop {
                tokio::select! {
                    msg = read.next() => match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Ok(value) = serde_json::from_str::<Value>(&text) {
                                let _ = received_tx.send(value);
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = write.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    },
                    command = commands_rx.recv() => match command {
                        Some(MockCommand::Send(value)) => {
                            if write.send(Message::Text(value.to_string().into())).await.is_err() {
                                break;
                            }
                        }
                        Some(MockCommand::Close) | None => {
                            let _ = write.send(Message::Close(None)).await;
                            break;
                        }
                    },
                }
            }
            // Dropping `received_tx` here tells the test the connection is gone
        });

        Self {
            addr,
            handshake: Some(handshake_rx),
            received: received_rx,
            commands: commands_tx,
        }
    }

    /// Base URL the relay should be pointed at.
    pub fn url(&self) -> String {
        format!("ws://{}/v1/realtime", self.addr)
    }

    pub async fn handshake(&mut self) -> Handshake {
        let rx = self.handshake.take().expect("handshake already taken");
        timeout(WAIT, rx)
            .await
            .expect("timed out waiting for handshake")
            .expect("mock closed before handshake")
    }

    /// Next JSON message from the relay.
    pub async fn recv(&mut self) -> Value {
        timeout(WAIT, self.received.recv())
            .await
            .expect("timed out waiting for a message")
            .expect("connection closed")
    }

    /// Next message whose `type` matches, skipping the rest.
    pub async fn recv_type(&mut self, event_type: &str) -> Value {
        loop {
            let value = self.recv().await;
            if value["type"] == event_type {
                return value;
            }
        }
    }

    pub fn send(&self, value: Value) {
        let _ = self.commands.send(MockCommand::Send(value));
    }

    pub fn close(&self) {
        let _ = self.commands.send(MockCommand::Close);
    }

    /// Wait until the relay's connection has gone away.
    pub async fn closed(&mut self) {
        timeout(WAIT, async {
            while self.received.recv().await.is_some() {}
        })
        .await
        .expect("timed out waiting for the connection to close");
    }
}
