//! Registry of live connections
//!
//! Every operation takes the single registry lock for exactly one call.
//! `snapshot` clones the member handles under the read lock, so fan-out
//! iterates a consistent copy while handlers keep adding and removing.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::connection::{Connection, ConnectionId};

/// Shared set of currently live connections
pub struct Registry<P> {
    connections: RwLock<HashMap<ConnectionId, Arc<dyn Connection<P>>>>,
}

impl<P: Send + Sync> Registry<P> {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a connection as live. Re-adding a present connection is a no-op.
    pub fn add(&self, conn: Arc<dyn Connection<P>>) {
        self.connections.write().entry(conn.id()).or_insert(conn);
    }

    /// Remove a connection, returning it if it was present
    pub fn remove(&self, id: ConnectionId) -> Option<Arc<dyn Connection<P>>> {
        self.connections.write().remove(&id)
    }

    /// Point-in-time copy of the live set
    pub fn snapshot(&self) -> Vec<Arc<dyn Connection<P>>> {
        self.connections.read().values().cloned().collect()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    /// Remove and return every member (used at shutdown)
    pub fn drain(&self) -> Vec<Arc<dyn Connection<P>>> {
        self.connections.write().drain().map(|(_, conn)| conn).collect()
    }
}

impl<P: Send + Sync> Default for Registry<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::testing::MockPeer;
    use rand::Rng;
    use std::collections::HashSet;

    fn ids(conns: &[Arc<dyn Connection<String>>]) -> HashSet<ConnectionId> {
        conns.iter().map(|c| c.id()).collect()
    }

    #[test]
    fn test_add_is_idempotent() {
        let registry = Registry::new();
        let peer = MockPeer::new();

        registry.add(peer.handle());
        registry.add(peer.handle());

        assert_eq!(registry.len(), 1);
        assert!(registry.contains(peer.id()));
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let registry: Registry<String> = Registry::new();
        let peer = MockPeer::new();

        assert!(registry.remove(peer.id()).is_none());
        assert!(registry.is_empty());

        registry.add(peer.handle());
        assert!(registry.remove(peer.id()).is_some());
        assert!(registry.remove(peer.id()).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_is_detached_from_later_mutation() {
        let registry = Registry::new();
        let a = MockPeer::new();
        let b = MockPeer::new();
        registry.add(a.handle());
        registry.add(b.handle());

        let snapshot = registry.snapshot();
        registry.remove(a.id());
        registry.add(MockPeer::new().handle());

        assert_eq!(ids(&snapshot), HashSet::from([a.id(), b.id()]));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_drain_empties_registry() {
        let registry = Registry::new();
        for _ in 0..5 {
            registry.add(MockPeer::new().handle());
        }

        assert_eq!(registry.drain().len(), 5);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_random_replay_matches_model() {
        let mut rng = rand::thread_rng();

        for _ in 0..50 {
            let registry = Registry::new();
            let peers: Vec<MockPeer> = (0..16).map(|_| MockPeer::new()).collect();
            let mut model = HashSet::new();

            for _ in 0..200 {
                let peer = &peers[rng.gen_range(0..peers.len())];
                if rng.gen_bool(0.5) {
                    registry.add(peer.handle());
                    model.insert(peer.id());
                } else {
                    registry.remove(peer.id());
                    model.remove(&peer.id());
                }
            }

            assert_eq!(ids(&registry.snapshot()), model);
            assert_eq!(registry.len(), model.len());
        }
    }

    #[test]
    fn test_concurrent_mutation_never_tears_snapshot() {
        let registry = Arc::new(Registry::new());
        let stable: Vec<MockPeer> = (0..8).map(|_| MockPeer::new()).collect();
        for peer in &stable {
            registry.add(peer.handle());
        }
        let stable_ids: HashSet<ConnectionId> = stable.iter().map(|p| p.id()).collect();

        let writers: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        let peer = MockPeer::new();
                        registry.add(peer.handle());
                        registry.remove(peer.id());
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                let stable_ids = stable_ids.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        let snapshot = registry.snapshot();
                        let seen = ids(&snapshot);
                        // Every entry is a whole connection and stable members never vanish
                        assert_eq!(seen.len(), snapshot.len());
                        assert!(stable_ids.is_subset(&seen));
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().unwrap();
        }

        assert_eq!(ids(&registry.snapshot()), stable_ids);
    }
}
