//! Relay front door
//!
//! Turns inbound HTTP upgrade requests into relay connections and serves
//! the supporting HTTP endpoints.

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod websocket;

pub use server::{ApiServer, AppState};
