//! Connection abstraction
//!
//! A `Connection` is one established bidirectional channel to a client.
//! The relay core only ever talks to clients through this trait.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;

/// Identity of a live connection, used as its Registry key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One established bidirectional channel carrying payloads of type `P`
///
/// `send` is only called by the broadcaster and `receive` only by the
/// connection's own handler, so implementations may serialize each
/// direction independently.
#[async_trait]
pub trait Connection<P>: Send + Sync {
    /// Stable identity of this connection
    fn id(&self) -> ConnectionId;

    /// Write one payload to the client
    async fn send(&self, payload: &P) -> Result<()>;

    /// Wait for the next payload from the client
    ///
    /// Returns an error once the client disconnected, the transport failed,
    /// or `close` was called.
    async fn receive(&self) -> Result<P>;

    /// Close the channel. Idempotent; wakes a pending `receive`.
    async fn close(&self);
}
