//! Relay counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Monotonic relay counters, updated lock-free from every task
#[derive(Debug, Default)]
pub struct RelayStats {
    connections_opened: AtomicU64,
    connections_closed: AtomicU64,
    payloads_received: AtomicU64,
    fan_out_passes: AtomicU64,
    deliveries: AtomicU64,
    evictions: AtomicU64,
}

/// Point-in-time copy of `RelayStats`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub connections_opened: u64,
    pub connections_closed: u64,
    pub payloads_received: u64,
    pub fan_out_passes: u64,
    pub deliveries: u64,
    pub evictions: u64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn payload_received(&self) {
        self.payloads_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fan_out(&self, delivered: usize, evicted: usize) {
        self.fan_out_passes.fetch_add(1, Ordering::Relaxed);
        self.deliveries.fetch_add(delivered as u64, Ordering::Relaxed);
        self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            payloads_received: self.payloads_received.load(Ordering::Relaxed),
            fan_out_passes: self.fan_out_passes.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
