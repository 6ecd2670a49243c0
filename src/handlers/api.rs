use axum::{Json, response::IntoResponse};
use serde_json::json;

/// Health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "message": "Twilio Media Stream Server is running!" }))
}
