//! Relay core
//!
//! This module provides the connection registry and broadcast fan-out:
//! - One handler task per connection feeding an unbounded outbound queue
//! - One broadcaster task fanning each payload out to the registry
//! - Eviction of any connection whose read or write fails
//! - Shutdown that closes every connection and joins every task

pub mod broadcaster;
pub mod connection;
pub mod handler;
pub mod payload;
pub mod registry;
pub mod stats;
pub mod ws;

#[cfg(test)]
mod testing;

pub use broadcaster::{BroadcastQueue, Broadcaster, BroadcasterConfig, DeliveryPolicy, FanOutReport};
pub use connection::{Connection, ConnectionId};
pub use handler::ConnectionHandler;
pub use payload::{ChatCodec, ChatMessage, Codec, Frame, SignalCodec};
pub use registry::Registry;
pub use stats::{RelayStats, StatsSnapshot};
pub use ws::WsConnection;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{info, instrument, warn};

use crate::error::{RelayError, Result};

/// How long shutdown waits for handler tasks before aborting them
const HANDLER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Running relay: registry, queue, broadcaster task and handler tasks
pub struct Relay<P> {
    registry: Arc<Registry<P>>,
    queue: BroadcastQueue<P>,
    stats: Arc<RelayStats>,
    config: BroadcasterConfig,
    handlers: Mutex<JoinSet<()>>,
    broadcaster: Mutex<Option<JoinHandle<()>>>,
    shutdown_tx: watch::Sender<bool>,
}

impl<P: Send + Sync + 'static> Relay<P> {
    /// Create the relay and spawn its broadcaster
    pub fn start(config: BroadcasterConfig) -> Arc<Self> {
        let registry = Arc::new(Registry::new());
        let stats = Arc::new(RelayStats::new());
        let (queue, queue_rx) = BroadcastQueue::channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let broadcaster = Broadcaster::new(registry.clone(), config.clone(), stats.clone());
        let broadcaster_task = tokio::spawn(async move {
            broadcaster.run(queue_rx, shutdown_rx).await;
        });

        Arc::new(Self {
            registry,
            queue,
            stats,
            config,
            handlers: Mutex::new(JoinSet::new()),
            broadcaster: Mutex::new(Some(broadcaster_task)),
            shutdown_tx,
        })
    }

    /// Register a connection and spawn its read loop
    pub fn attach(&self, conn: Arc<dyn Connection<P>>) -> Result<ConnectionId> {
        let mut handlers = self.handlers.lock();

        // Checked under the handlers lock so shutdown cannot miss this task
        if *self.shutdown_tx.borrow() {
            drop(handlers);
            tokio::spawn(async move { conn.close().await });
            return Err(RelayError::ShuttingDown);
        }

        // Reap finished handlers so the set tracks only live ones
        while handlers.try_join_next().is_some() {}

        let handler = ConnectionHandler::start(
            conn,
            self.registry.clone(),
            self.queue.clone(),
            self.stats.clone(),
        );
        let id = handler.id();
        handlers.spawn(handler.run());

        Ok(id)
    }

    pub fn registry(&self) -> &Arc<Registry<P>> {
        &self.registry
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn config(&self) -> &BroadcasterConfig {
        &self.config
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Close every connection and join every task; queued payloads are dropped
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        let mut handlers = {
            let mut guard = self.handlers.lock();
            if self.shutdown_tx.send_replace(true) {
                return;
            }
            std::mem::take(&mut *guard)
        };

        let connections = self.registry.drain();
        info!("Relay shutting down, closing {} connections", connections.len());
        futures::future::join_all(connections.iter().map(|conn| conn.close())).await;

        let drained = tokio::time::timeout(HANDLER_DRAIN_TIMEOUT, async {
            while handlers.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!("Connection handlers did not stop in time, aborting {}", handlers.len());
            handlers.shutdown().await;
        }

        let broadcaster = self.broadcaster.lock().take();
        if let Some(task) = broadcaster {
            let _ = task.await;
        }

        info!("Relay stopped");
    }
}
