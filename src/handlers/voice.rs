//! Call-setup webhook.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use crate::core::telephony::ConnectStreamTwiml;
use crate::state::AppState;

/// Answer an incoming call with a document that connects its media stream
/// to `/media-stream` on this host.
pub async fn incoming_call(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let request_host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok());

    let Some(host) = state.public_host(request_host) else {
        warn!("Incoming call request without a Host header");
        return (StatusCode::BAD_REQUEST, "Missing Host header").into_response();
    };

    info!(host, "Incoming call");

    let twiml = ConnectStreamTwiml::new(host)
        .greeting(&state.config.greeting_message)
        .ready_message(&state.config.ready_message)
        .render();

    ([(header::CONTENT_TYPE, "text/xml")], twiml).into_response()
}
