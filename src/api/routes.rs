//! API route definitions

use axum::routing::get;
use axum::Router;
use tower_http::services::ServeDir;

use crate::config::{ServerConfig, HEALTH_PATH, STATUS_PATH};
use crate::relay::Codec;

use super::handlers;
use super::server::AppState;
use super::websocket;

/// Create the router: relay endpoint, health, status and static files
pub fn create_router<C: Codec>(state: AppState<C>, config: &ServerConfig) -> Router {
    let router = Router::new()
        .route(HEALTH_PATH, get(handlers::health::health_check))
        .route(STATUS_PATH, get(handlers::health::status::<C>))
        .route(&config.ws_path, get(websocket::relay::relay_ws::<C>));

    let router = match &config.static_root {
        Some(root) => router.fallback_service(ServeDir::new(root)),
        None => router,
    };

    router.with_state(state)
}
