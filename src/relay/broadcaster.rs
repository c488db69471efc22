//! Broadcaster: the single consumer of the outbound queue
//!
//! The queue is unbounded so that a reader never waits on a slow fan-out.
//! Exactly one fan-out pass runs at a time; the sends inside one pass run
//! side by side, each bounded by the configured send timeout. Evicted
//! connections are then closed side by side as well, so any number of stalled
//! clients delay a pass by at most the send timeout plus one close timeout.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, info, instrument, trace, warn};

use super::connection::{Connection, ConnectionId};
use super::registry::Registry;
use super::stats::RelayStats;
use crate::error::{RelayError, Result};

/// Whether the author of a payload receives its own copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPolicy {
    IncludeSender,
    ExcludeSender,
}

impl DeliveryPolicy {
    pub fn from_echo(echo_sender: bool) -> Self {
        if echo_sender {
            Self::IncludeSender
        } else {
            Self::ExcludeSender
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IncludeSender => "include_sender",
            Self::ExcludeSender => "exclude_sender",
        }
    }

    fn delivers_to(&self, origin: ConnectionId, recipient: ConnectionId) -> bool {
        match self {
            Self::IncludeSender => true,
            Self::ExcludeSender => origin != recipient,
        }
    }
}

/// Broadcaster configuration
#[derive(Debug, Clone)]
pub struct BroadcasterConfig {
    pub delivery: DeliveryPolicy,
    /// Upper bound on a single send; `None` waits forever
    pub send_timeout: Option<Duration>,
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            delivery: DeliveryPolicy::IncludeSender,
            send_timeout: Some(Duration::from_secs(10)),
        }
    }
}

/// One payload awaiting fan-out
#[derive(Debug, Clone)]
pub struct Outbound<P> {
    pub origin: ConnectionId,
    pub payload: P,
}

/// Producer side of the outbound queue
pub struct BroadcastQueue<P> {
    tx: mpsc::UnboundedSender<Outbound<P>>,
}

impl<P> Clone for BroadcastQueue<P> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<P> BroadcastQueue<P> {
    /// Create the queue, returning the producer handle and the consumer end
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outbound<P>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Append a payload. Never waits; fails only once the consumer is gone.
    pub fn enqueue(&self, origin: ConnectionId, payload: P) -> Result<()> {
        self.tx
            .send(Outbound { origin, payload })
            .map_err(|_| RelayError::QueueClosed)
    }
}

/// Outcome of one fan-out pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    pub recipients: usize,
    pub delivered: usize,
    pub evicted: usize,
}

/// Fans every queued payload out to the registry
pub struct Broadcaster<P> {
    registry: Arc<Registry<P>>,
    config: BroadcasterConfig,
    stats: Arc<RelayStats>,
}

impl<P: Send + Sync + 'static> Broadcaster<P> {
    pub fn new(registry: Arc<Registry<P>>, config: BroadcasterConfig, stats: Arc<RelayStats>) -> Self {
        Self {
            registry,
            config,
            stats,
        }
    }

    /// Consume the queue until shutdown or until every producer is gone
    #[instrument(skip_all)]
    pub async fn run(
        &self,
        mut queue: mpsc::UnboundedReceiver<Outbound<P>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(
            "Broadcaster started (delivery: {}, send timeout: {:?})",
            self.config.delivery.as_str(),
            self.config.send_timeout
        );

        loop {
            tokio::select! {
                next = queue.recv() => {
                    match next {
                        Some(outbound) => {
                            self.fan_out(&outbound).await;
                        }
                        None => {
                            debug!("Outbound queue closed");
                            break;
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Broadcaster shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Deliver one payload to every live connection in a fresh snapshot
    pub async fn fan_out(&self, outbound: &Outbound<P>) -> FanOutReport {
        let recipients: Vec<_> = self
            .registry
            .snapshot()
            .into_iter()
            .filter(|conn| self.config.delivery.delivers_to(outbound.origin, conn.id()))
            .collect();

        let sends = recipients.iter().map(|conn| async move {
            let result = self.send_one(conn.as_ref(), &outbound.payload).await;
            (conn, result)
        });
        let results = join_all(sends).await;

        let mut report = FanOutReport {
            recipients: recipients.len(),
            ..FanOutReport::default()
        };

        let mut evicted = Vec::new();
        for (conn, result) in results {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(conn = %conn.id(), "Send failed, evicting connection: {}", e);
                    self.registry.remove(conn.id());
                    evicted.push(conn);
                }
            }
        }
        report.evicted = evicted.len();
        join_all(evicted.iter().map(|conn| conn.close())).await;

        trace!(
            origin = %outbound.origin,
            "Fan-out complete: {}/{} delivered, {} evicted",
            report.delivered,
            report.recipients,
            report.evicted
        );
        self.stats.record_fan_out(report.delivered, report.evicted);

        report
    }

    async fn send_one(&self, conn: &dyn Connection<P>, payload: &P) -> Result<()> {
        match self.config.send_timeout {
            Some(limit) => timeout(limit, conn.send(payload))
                .await
                .map_err(|_| RelayError::SendTimeout(limit))?,
            None => conn.send(payload).await,
        }
    }
}
