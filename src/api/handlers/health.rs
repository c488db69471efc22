//! Health and status endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::api::server::AppState;
use crate::relay::Codec;

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "wsrelay"
        })),
    )
}

/// Relay status: variant, live connections and counters
pub async fn status<C: Codec>(State(state): State<AppState<C>>) -> impl IntoResponse {
    let uptime = Utc::now() - state.started_at;
    let config = state.relay.config();

    Json(json!({
        "variant": C::NAME,
        "delivery": config.delivery.as_str(),
        "send_timeout_ms": config.send_timeout.map(|t| t.as_millis() as u64),
        "started_at": state.started_at,
        "uptime_secs": uptime.num_seconds(),
        "connections": state.relay.connection_count(),
        "stats": state.relay.stats(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OriginPolicy, ServerConfig};
    use crate::relay::{BroadcasterConfig, ChatCodec, ChatMessage, Relay};
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn server_config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ws_path: "/".to_string(),
            static_root: None,
            origin_policy: OriginPolicy::SameHost,
        }
    }

    async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_check() {
        let relay = Relay::<ChatMessage>::start(BroadcasterConfig::default());
        let state = AppState::<ChatCodec> {
            relay: relay.clone(),
            origin_policy: Arc::new(OriginPolicy::SameHost),
            started_at: Utc::now(),
        };
        let app = crate::api::routes::create_router(state, &server_config());

        let (status, body) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        relay.shutdown().await;
    }

    #[tokio::test]
    async fn test_status_reports_relay_state() {
        let relay = Relay::<ChatMessage>::start(BroadcasterConfig::default());
        let state = AppState::<ChatCodec> {
            relay: relay.clone(),
            origin_policy: Arc::new(OriginPolicy::SameHost),
            started_at: Utc::now(),
        };
        let app = crate::api::routes::create_router(state, &server_config());

        let (status, body) = get_json(app, "/api/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["variant"], "chat");
        assert_eq!(body["delivery"], "include_sender");
        assert_eq!(body["send_timeout_ms"], 10000);
        assert_eq!(body["connections"], 0);
        assert_eq!(body["stats"]["deliveries"], 0);

        relay.shutdown().await;
    }
}
