//! HTTP route tests
//!
//! Exercises the router in-process with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use tower::util::ServiceExt;

use phone_relay::core::realtime::AudioFormat;
use phone_relay::core::relay::LogEventTypes;
use phone_relay::core::telephony::{DEFAULT_GREETING, DEFAULT_READY_MESSAGE};
use phone_relay::telemetry::MemorySink;
use phone_relay::{ServerConfig, routes, state::AppState};

fn create_minimal_config(public_host: Option<&str>) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 5050,
        tls: None,
        public_host: public_host.map(str::to_string),
        openai_api_key: "sk-test".to_string(),
        realtime_url: "wss://api.openai.com/v1/realtime".to_string(),
        realtime_model: "gpt-4o-realtime-preview-2024-10-01".to_string(),
        voice: "shimmer".to_string(),
        instructions: "Be brief.".to_string(),
        temperature: 0.8,
        audio_format: AudioFormat::G711Ulaw,
        settle_delay_ms: 250,
        log_event_types: LogEventTypes::default(),
        greeting_message: DEFAULT_GREETING.to_string(),
        ready_message: DEFAULT_READY_MESSAGE.to_string(),
    }
}

fn app(config: ServerConfig) -> axum::Router {
    let state = AppState::with_sink(config, Arc::new(MemorySink::new())).unwrap();
    routes::app(state)
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let response = app(create_minimal_config(None))
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["message"], "Twilio Media Stream Server is running!");
}

#[tokio::test]
async fn test_incoming_call_uses_host_header() {
    let response = app(create_minimal_config(None))
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/incoming-call")
                .header(header::HOST, "abc123.ngrok.app")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/xml"
    );

    let body = body_string(response).await;
    assert!(body.starts_with("<?xml"));
    assert!(body.contains("<Pause length=\"1\"/>"));
    assert!(body.contains("<Stream url=\"wss://abc123.ngrok.app/media-stream\" />"));
    assert!(body.contains("O.K. you can start talking!"));

    let greeting = body.find("Please wait").unwrap();
    let ready = body.find("O.K.").unwrap();
    let connect = body.find("<Connect>").unwrap();
    assert!(greeting < ready && ready < connect);
}

#[tokio::test]
async fn test_incoming_call_accepts_get() {
    let response = app(create_minimal_config(None))
        .oneshot(
            Request::builder()
                .uri("/incoming-call")
                .header(header::HOST, "localhost:5050")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("wss://localhost:5050/media-stream"));
}

#[tokio::test]
async fn test_incoming_call_prefers_public_host() {
    let response = app(create_minimal_config(Some("relay.example.com")))
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/incoming-call")
                .header(header::HOST, "10.0.0.5:5050")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = body_string(response).await;
    assert!(body.contains("wss://relay.example.com/media-stream"));
    assert!(!body.contains("10.0.0.5"));
}

#[tokio::test]
async fn test_incoming_call_escapes_text() {
    let mut config = create_minimal_config(None);
    config.greeting_message = "Tom & Jerry <support>".to_string();

    let response = app(config)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/incoming-call")
                .header(header::HOST, "example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = body_string(response).await;
    assert!(body.contains("Tom &amp; Jerry &lt;support&gt;"));
}

#[tokio::test]
async fn test_incoming_call_without_host_is_rejected() {
    let response = app(create_minimal_config(None))
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/incoming-call")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_media_stream_requires_upgrade() {
    let response = app(create_minimal_config(None))
        .oneshot(
            Request::builder()
                .uri("/media-stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let response = app(create_minimal_config(None))
        .oneshot(
            Request::builder()
                .uri("/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
