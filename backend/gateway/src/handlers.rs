use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::{error, info, warn};

use dustline_channels::{verify_signature, InboundMessage, WebhookEnvelope};

use crate::server::AppState;

/// Health check document.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Dustline PM2.5 chatbot is running"
    }))
}

/// LINE webhook endpoint.
///
/// The signature covers the raw body, so verification happens before any
/// JSON parsing. A bad signature rejects the whole batch unprocessed.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = headers
        .get("x-line-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !verify_signature(&state.channel_secret, signature, &body) {
        warn!("Invalid LINE signature, rejecting webhook");
        return (StatusCode::BAD_REQUEST, "invalid_signature").into_response();
    }

    let envelope: WebhookEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            error!(error = %e, "Malformed webhook payload");
            return (StatusCode::BAD_REQUEST, "bad_json").into_response();
        }
    };

    for event in envelope.events {
        let Some(user_id) = event.user_id().map(str::to_owned) else {
            continue;
        };
        let Some(message) = event.inbound_message() else {
            continue;
        };

        // Hold this user's lock across the whole read-modify-write so a
        // concurrent delivery for the same user cannot interleave.
        let reply_text = {
            let lock = state.locks.lock_for(&user_id);
            let _guard = lock.lock().await;
            match message {
                InboundMessage::Text(text) => {
                    info!(user = %truncate_id(&user_id), "Text message received");
                    state.router.handle_text(&user_id, &text).await
                }
                InboundMessage::Location { lat, lng } => {
                    info!(user = %truncate_id(&user_id), lat, lng, "Location received");
                    state.router.handle_location(&user_id, lat, lng).await
                }
            }
        };

        // Session state is already committed; a failed reply is only logged.
        if let Some(reply_token) = event.reply_token.as_deref() {
            if let Err(e) = state.line.reply(reply_token, &reply_text).await {
                error!(error = %e, "Failed to send reply");
            }
        }
    }

    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

/// Manually trigger the PM2.5 broadcast.
pub async fn manual_broadcast(State(state): State<AppState>) -> Json<serde_json::Value> {
    info!("Manual broadcast triggered");
    let (status, message) = if state.broadcast.run().await {
        ("ok", "Broadcast sent")
    } else {
        ("failed", "Broadcast failed")
    };
    Json(json!({ "status": status, "message": message }))
}

/// Only a stable prefix of the opaque user id goes into logs.
fn truncate_id(user_id: &str) -> &str {
    user_id.get(..8).unwrap_or(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    use tower::ServiceExt;

    use dustline_airquality::{AreaSummary, NearestStation, StationProvider};
    use dustline_assessment::Assessment;
    use dustline_broadcast::BroadcastService;
    use dustline_channels::LineClient;
    use dustline_core::{BotError, ConversationState};
    use dustline_routing::MessageRouter;
    use dustline_session::{SessionStore, UserLocks};

    use crate::server::{build_router, AppState};

    struct NoStations;

    #[async_trait]
    impl StationProvider for NoStations {
        async fn nearest_station(
            &self,
            _: f64,
            _: f64,
        ) -> Result<Option<NearestStation>, BotError> {
            Ok(None)
        }
        async fn bangkok_average(&self) -> Result<Option<AreaSummary>, BotError> {
            Ok(None)
        }
    }

    fn test_state(dir: &tempfile::TempDir) -> (Arc<SessionStore>, AppState) {
        let store = Arc::new(SessionStore::open(dir.path().join("state.json")));
        let assessment = Arc::new(Assessment::new(Arc::clone(&store)));
        let stations: Arc<dyn StationProvider> = Arc::new(NoStations);
        let router = Arc::new(MessageRouter::new(
            Arc::clone(&store),
            assessment,
            Arc::clone(&stations),
        ));
        let line = Arc::new(LineClient::new("test-token"));
        let broadcast = Arc::new(BroadcastService::new(
            "http://localhost:1/none",
            Arc::clone(&line),
            stations,
        ));
        let state = AppState {
            channel_secret: "test-secret".to_string(),
            router,
            locks: Arc::new(UserLocks::new()),
            line,
            broadcast,
        };
        (store, state)
    }

    fn sign(secret: &str, body: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body.as_bytes());
        BASE64.encode(mac.finalize().into_bytes())
    }

    fn webhook_request(secret: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("x-line-signature", sign(secret, body))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let (_, state) = test_state(&dir);
        let response = build_router(state)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_webhook_rejects_bad_signature() {
        let dir = tempfile::tempdir().unwrap();
        let (store, state) = test_state(&dir);
        let body = r#"{"events":[{"type":"message","source":{"userId":"U1"},"message":{"type":"text","text":"สวัสดี"}}]}"#;

        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("x-line-signature", "bogus")
            .body(Body::from(body))
            .unwrap();
        let response = build_router(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        // Nothing was processed.
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_webhook_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let (_, state) = test_state(&dir);
        let body = "{not json";
        let response = build_router(state)
            .oneshot(webhook_request("test-secret", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_webhook_processes_signed_event() {
        let dir = tempfile::tempdir().unwrap();
        let (store, state) = test_state(&dir);
        // No replyToken: the reply step is skipped, routing still runs.
        let body = r#"{"events":[{"type":"message","source":{"userId":"U1"},"message":{"type":"text","text":"ตรวจสอบค่าฝุ่น"}}]}"#;

        let response = build_router(state)
            .oneshot(webhook_request("test-secret", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let session = store.session("U1").await;
        assert_eq!(session.state, ConversationState::AwaitingLocation);
    }
}
