//! Per-connection read loop

use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use super::broadcaster::BroadcastQueue;
use super::connection::{Connection, ConnectionId};
use super::registry::Registry;
use super::stats::RelayStats;

/// Reads payloads from one connection and feeds them to the broadcaster
///
/// The connection is live in the registry from `start` until `run` returns.
pub struct ConnectionHandler<P> {
    conn: Arc<dyn Connection<P>>,
    registry: Arc<Registry<P>>,
    queue: BroadcastQueue<P>,
    stats: Arc<RelayStats>,
}

impl<P: Send + Sync + 'static> ConnectionHandler<P> {
    /// Register the connection and return its handler
    pub fn start(
        conn: Arc<dyn Connection<P>>,
        registry: Arc<Registry<P>>,
        queue: BroadcastQueue<P>,
        stats: Arc<RelayStats>,
    ) -> Self {
        registry.add(conn.clone());
        stats.connection_opened();
        info!(conn = %conn.id(), "Connection registered ({} live)", registry.len());

        Self {
            conn,
            registry,
            queue,
            stats,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.conn.id()
    }

    /// Read until the connection fails, then unregister and close it
    pub async fn run(self) {
        let id = self.conn.id();

        loop {
            match self.conn.receive().await {
                Ok(payload) => {
                    trace!(conn = %id, "Payload received");
                    self.stats.payload_received();
                    if let Err(e) = self.queue.enqueue(id, payload) {
                        debug!(conn = %id, "Dropping connection: {}", e);
                        break;
                    }
                }
                Err(e) => {
                    if e.is_disconnect() {
                        debug!(conn = %id, "Connection closed: {}", e);
                    } else {
                        warn!(conn = %id, "Receive failed, dropping connection: {}", e);
                    }
                    break;
                }
            }
        }

        self.registry.remove(id);
        self.conn.close().await;
        self.stats.connection_closed();
        info!(conn = %id, "Connection unregistered ({} live)", self.registry.len());
    }
}
