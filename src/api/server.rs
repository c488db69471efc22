//! Relay HTTP server using Axum
//!
//! Accepts WebSocket upgrades for the relay endpoint and serves health,
//! status and (optionally) static files.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

use crate::config::{OriginPolicy, ServerConfig};
use crate::error::{RelayError, Result};
use crate::relay::{Codec, Relay};

use super::routes;

/// Shared state for API handlers
pub struct AppState<C: Codec> {
    pub relay: Arc<Relay<C::Payload>>,
    pub origin_policy: Arc<OriginPolicy>,
    pub started_at: DateTime<Utc>,
}

impl<C: Codec> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            relay: self.relay.clone(),
            origin_policy: self.origin_policy.clone(),
            started_at: self.started_at,
        }
    }
}

/// API server
pub struct ApiServer<C: Codec> {
    config: ServerConfig,
    state: AppState<C>,
}

impl<C: Codec> ApiServer<C> {
    /// Create a new API server in front of a running relay
    pub fn new(config: ServerConfig, relay: Arc<Relay<C::Payload>>) -> Self {
        if config.origin_policy == OriginPolicy::AllowAll {
            warn!("Origin policy is allow_all: WebSocket upgrades are accepted from any site");
        }

        let state = AppState {
            relay,
            origin_policy: Arc::new(config.origin_policy.clone()),
            started_at: Utc::now(),
        };

        Self { config, state }
    }

    /// Build the router
    fn build_router(&self) -> Router {
        routes::create_router(self.state.clone(), &self.config).layer(TraceLayer::new_for_http())
    }

    /// Bind the configured address and serve until shutdown
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| RelayError::InvalidConfig(format!("Invalid listen address: {}", e)))?;

        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until shutdown
    pub async fn serve(
        &self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let router = self.build_router();

        info!(
            "{} relay listening on {} (ws path: {}, origin policy: {})",
            C::NAME,
            listener.local_addr()?,
            self.config.ws_path,
            self.config.origin_policy.as_str()
        );

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await?;

        info!("API server shut down");
        Ok(())
    }
}
