//! In-memory connection used by the relay unit tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use super::connection::{Connection, ConnectionId};
use crate::error::{RelayError, Result};

/// Test connection whose inbound side is fed by a channel and whose
/// outbound side records every delivered payload.
pub struct MockConnection {
    id: ConnectionId,
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
    delivered: Mutex<Vec<String>>,
    fail_sends: AtomicBool,
    stall_sends: AtomicBool,
    close_delay: Mutex<Option<Duration>>,
    close_calls: AtomicUsize,
    closed: watch::Sender<bool>,
}

/// Client side of a `MockConnection`
pub struct MockPeer {
    pub conn: Arc<MockConnection>,
    tx: Option<mpsc::UnboundedSender<String>>,
}

impl MockPeer {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (closed, _) = watch::channel(false);
        let conn = Arc::new(MockConnection {
            id: ConnectionId::new(),
            inbound: tokio::sync::Mutex::new(rx),
            delivered: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
            stall_sends: AtomicBool::new(false),
            close_delay: Mutex::new(None),
            close_calls: AtomicUsize::new(0),
            closed,
        });
        Self { conn, tx: Some(tx) }
    }

    pub fn id(&self) -> ConnectionId {
        self.conn.id
    }

    pub fn handle(&self) -> Arc<dyn Connection<String>> {
        self.conn.clone()
    }

    /// Deliver a payload as if the client had sent it
    pub fn say(&self, payload: &str) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(payload.to_string());
        }
    }

    /// Simulate the client hanging up
    pub fn hang_up(&mut self) {
        self.tx = None;
    }

    /// Simulate a broken write path
    pub fn break_transport(&self) {
        self.conn.fail_sends.store(true, Ordering::SeqCst);
    }

    /// Simulate a client that never drains its socket
    pub fn stall(&self) {
        self.conn.stall_sends.store(true, Ordering::SeqCst);
    }

    /// Make every `close` take `delay`, like a socket with a full send buffer
    pub fn slow_close(&self, delay: Duration) {
        *self.conn.close_delay.lock() = Some(delay);
    }

    pub fn delivered(&self) -> Vec<String> {
        self.conn.delivered.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        *self.conn.closed.borrow()
    }

    pub fn close_calls(&self) -> usize {
        self.conn.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connection<String> for MockConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn send(&self, payload: &String) -> Result<()> {
        if *self.closed.borrow() {
            return Err(RelayError::ConnectionClosed);
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(RelayError::Transport("broken pipe".to_string()));
        }
        if self.stall_sends.load(Ordering::SeqCst) {
            let mut closed = self.closed.subscribe();
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(3600)) => {}
                _ = async { let _ = closed.wait_for(|c| *c).await; } => {
                    return Err(RelayError::ConnectionClosed);
                }
            }
        }
        self.delivered.lock().push(payload.clone());
        Ok(())
    }

    async fn receive(&self) -> Result<String> {
        let mut closed = self.closed.subscribe();
        let mut inbound = self.inbound.lock().await;
        tokio::select! {
            next = inbound.recv() => next.ok_or(RelayError::ConnectionClosed),
            _ = async { let _ = closed.wait_for(|c| *c).await; } => {
                Err(RelayError::ConnectionClosed)
            }
        }
    }

    async fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.closed.send_replace(true) {
            return;
        }
        let delay = *self.close_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Poll `check` until it holds or two seconds pass
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
