//! WebSocket handlers
//!
//! Upgraded sockets are wrapped in a `WsConnection` and handed to the relay,
//! which owns them from then on.

pub mod relay;
