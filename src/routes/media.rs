//! Media-stream WebSocket route configuration

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::core::telephony::MEDIA_STREAM_PATH;
use crate::handlers::media_stream_handler;
use crate::state::AppState;

/// Create the media-stream WebSocket router
///
/// # Endpoint
///
/// `GET /media-stream` - WebSocket upgrade for one call's media stream
///
/// # Protocol
///
/// The telephony provider sends JSON text frames tagged by `event`
/// (`connected`, `start`, `media`, `stop`). Caller audio arrives base64
/// encoded in `media.payload`; synthesized audio is sent back as
/// `{"event": "media", "streamSid": ..., "media": {"payload": ...}}`.
pub fn create_media_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(MEDIA_STREAM_PATH, get(media_stream_handler))
        .layer(TraceLayer::new_for_http())
}
