//! Relay WebSocket handler

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::response::Response;
use tracing::{debug, warn};

use crate::api::middleware::check_origin;
use crate::api::server::AppState;
use crate::error::{RelayError, Result};
use crate::relay::{Codec, WsConnection};

/// WebSocket upgrade handler for the relay endpoint
pub async fn relay_ws<C: Codec>(
    ws: WebSocketUpgrade,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    State(state): State<AppState<C>>,
) -> Result<Response> {
    let peer = connect_info.map(|ConnectInfo(addr)| addr);

    if let Err(e) = check_origin(&state.origin_policy, &headers) {
        warn!(peer = ?peer, "Rejecting WebSocket upgrade: {}", e);
        return Err(e);
    }
    if state.relay.is_shutting_down() {
        return Err(RelayError::ShuttingDown);
    }

    Ok(ws
        .on_failed_upgrade(move |e| {
            warn!(peer = ?peer, "WebSocket handshake failed: {}", e);
        })
        .on_upgrade(move |socket| async move {
            let conn = Arc::new(WsConnection::<C>::new(socket, peer));
            match state.relay.attach(conn) {
                Ok(id) => debug!(conn = %id, peer = ?peer, "{} WebSocket connected", C::NAME),
                Err(e) => debug!(peer = ?peer, "WebSocket dropped: {}", e),
            }
        }))
}
