//! WebSocket-backed connection
//!
//! The socket is split so the broadcaster can write while the handler is
//! parked in `receive`. Each half sits behind its own async mutex.

use std::marker::PhantomData;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::{watch, Mutex};
use tokio::time::timeout;
use tracing::{debug, trace};

use super::connection::{Connection, ConnectionId};
use super::payload::{Codec, Frame};
use crate::error::{RelayError, Result};

/// How long `close` may spend taking the sink and writing the close frame
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// A relay connection over an upgraded WebSocket
pub struct WsConnection<C: Codec> {
    id: ConnectionId,
    peer: Option<SocketAddr>,
    sink: Mutex<SplitSink<WebSocket, Message>>,
    stream: Mutex<SplitStream<WebSocket>>,
    closed: watch::Sender<bool>,
    _codec: PhantomData<fn() -> C>,
}

impl<C: Codec> WsConnection<C> {
    pub fn new(socket: WebSocket, peer: Option<SocketAddr>) -> Self {
        let (sink, stream) = socket.split();
        let (closed, _) = watch::channel(false);

        Self {
            id: ConnectionId::new(),
            peer,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
            closed,
            _codec: PhantomData,
        }
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    async fn next_frame(stream: &mut SplitStream<WebSocket>) -> Result<Frame> {
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Frame::Text(text)),
                Some(Ok(Message::Binary(data))) => return Ok(Frame::Binary(data.into())),
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                    // Pong replies are handled by axum
                    continue;
                }
                Some(Ok(Message::Close(_))) | None => return Err(RelayError::ConnectionClosed),
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl<C: Codec> Connection<C::Payload> for WsConnection<C> {
    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn send(&self, payload: &C::Payload) -> Result<()> {
        if self.is_closed() {
            return Err(RelayError::ConnectionClosed);
        }

        let frame = C::encode(payload)?;
        let mut closed = self.closed.subscribe();

        // A client that stops reading parks the write forever; close() wakes it
        tokio::select! {
            result = async {
                let mut sink = self.sink.lock().await;
                sink.send(frame.into()).await
            } => Ok(result?),
            _ = async { let _ = closed.wait_for(|c| *c).await; } => {
                Err(RelayError::ConnectionClosed)
            }
        }
    }

    async fn receive(&self) -> Result<C::Payload> {
        let mut closed = self.closed.subscribe();
        let mut stream = self.stream.lock().await;

        let frame = tokio::select! {
            frame = Self::next_frame(&mut stream) => frame?,
            _ = async { let _ = closed.wait_for(|c| *c).await; } => {
                return Err(RelayError::ConnectionClosed);
            }
        };

        trace!(conn = %self.id, bytes = frame.len(), "Frame received");
        C::decode(frame)
    }

    async fn close(&self) {
        if self.closed.send_replace(true) {
            return;
        }

        let result = timeout(CLOSE_TIMEOUT, async {
            let mut sink = self.sink.lock().await;
            let _ = sink.send(Message::Close(None)).await;
            sink.close().await
        })
        .await;

        match result {
            Ok(Ok(())) => debug!(conn = %self.id, peer = ?self.peer, "WebSocket closed"),
            Ok(Err(e)) => debug!(conn = %self.id, peer = ?self.peer, "WebSocket close error: {}", e),
            Err(_) => debug!(conn = %self.id, peer = ?self.peer, "WebSocket close timed out"),
        }
    }
}
