//! Relayed payloads and their wire codecs

use axum::extract::ws::Message;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A single data frame as it travels over the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
}

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Frame::Text(text) => text.as_bytes(),
            Frame::Binary(data) => data,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Frame> for Message {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => Message::Text(text),
            Frame::Binary(data) => Message::Binary(data.to_vec()),
        }
    }
}

/// Chat message exchanged by the chat variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub username: String,
    #[serde(alias = "text")]
    pub message: String,
}

/// Maps wire frames to the payload type relayed by the core
pub trait Codec: Send + Sync + 'static {
    type Payload: Clone + Send + Sync + 'static;

    /// Variant name, used in logs and the status endpoint
    const NAME: &'static str;

    fn decode(frame: Frame) -> Result<Self::Payload>;

    fn encode(payload: &Self::Payload) -> Result<Frame>;
}

/// JSON chat records
pub struct ChatCodec;

impl Codec for ChatCodec {
    type Payload = ChatMessage;

    const NAME: &'static str = "chat";

    fn decode(frame: Frame) -> Result<ChatMessage> {
        Ok(serde_json::from_slice(frame.as_bytes())?)
    }

    fn encode(payload: &ChatMessage) -> Result<Frame> {
        Ok(Frame::Text(serde_json::to_string(payload)?))
    }
}

/// Opaque signaling frames, relayed verbatim
pub struct SignalCodec;

impl Codec for SignalCodec {
    type Payload = Frame;

    const NAME: &'static str = "signal";

    fn decode(frame: Frame) -> Result<Frame> {
        Ok(frame)
    }

    fn encode(payload: &Frame) -> Result<Frame> {
        Ok(payload.clone())
    }
}
