pub mod api;
pub mod media;

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// The complete application router.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(api::create_api_router())
        .merge(media::create_media_router())
        .with_state(state)
}
