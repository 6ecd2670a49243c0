use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, voice};
use crate::state::AppState;

/// Create the HTTP router: health check and the call-setup webhook.
///
/// The webhook answers both GET and POST since providers can be configured
/// to use either.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        .route(
            "/incoming-call",
            get(voice::incoming_call).post(voice::incoming_call),
        )
        .layer(TraceLayer::new_for_http())
}
