//! Media-stream WebSocket handler.
//!
//! Each upgraded connection is one call. The handler gives the call an id
//! and hands the socket to the relay, which runs until the caller hangs up.

use std::sync::Arc;

use axum::{
    extract::{State, ws::WebSocketUpgrade},
    response::Response,
};
use tracing::info;
use uuid::Uuid;

use crate::core::relay::relay_call;
use crate::state::AppState;

/// Maximum WebSocket frame size (1 MB); telephony media frames are tiny
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| async move {
            let call_id = Uuid::new_v4().to_string();
            info!(call_id = %call_id, "Media stream connected");

            let session = relay_call(
                call_id.clone(),
                state.relay.clone(),
                state.events.clone(),
                socket,
            )
            .await;

            info!(
                call_id = %call_id,
                phase = %session.phase(),
                media_forwarded = session.stats.media_forwarded,
                audio_forwarded = session.stats.audio_forwarded,
                "Media stream finished"
            );
        })
}
