//! wsrelay - Real-time WebSocket relay
//!
//! Clients connect over WebSocket, send messages, and every message is
//! rebroadcast to the connected clients.
//!
//! ## Features
//!
//! - Chat variant relaying `{username, message}` JSON records
//! - Signaling variant relaying opaque text/binary frames verbatim
//! - Lock-guarded connection registry with a single broadcaster task
//! - Per-recipient send timeout and eviction of failed connections
//! - Configurable origin checks and optional static file serving

pub mod api;
pub mod config;
pub mod error;
pub mod relay;

pub use config::Config;
pub use error::{RelayError, Result};
pub use relay::Relay;
