//! Server-side registry of currently alive nodes.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

/// Last known state for one node.
#[derive(Debug, Clone, Serialize)]
pub struct PeerEntry {
    pub node_id: String,
    /// Server receipt clock (epoch millis), not the sender's timestamp.
    /// Eviction decisions are made against this value only.
    pub last_seen_ms: i64,
    /// Payload of the most recent heartbeat.
    pub payload: String,
    /// Observed source address, used as the broadcast return address.
    pub addr: SocketAddr,
}

/// Concurrent map of node id to [`PeerEntry`].
///
/// One lock guards the whole map and entries are only ever replaced as a
/// unit, so no reader can observe a torn entry. Receive tasks write, the
/// monitor reads and deletes, the aggregator reads — all through these
/// operations; raw iteration over live state is never exposed.
#[derive(Clone, Default)]
pub struct PeerRegistry {
    inner: Arc<RwLock<HashMap<String, PeerEntry>>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or wholly replace the entry for `node_id`. Last writer wins in
    /// lock acquisition order. Returns true when the node was unknown.
    pub async fn upsert(
        &self,
        node_id: &str,
        addr: SocketAddr,
        payload: String,
        seen_at_ms: i64,
    ) -> bool {
        let mut map = self.inner.write().await;
        map.insert(
            node_id.to_string(),
            PeerEntry {
                node_id: node_id.to_string(),
                last_seen_ms: seen_at_ms,
                payload,
                addr,
            },
        )
        .is_none()
    }

    /// Remove every entry with `last_seen_ms` strictly before `cutoff_ms`
    /// and return the evicted ids.
    pub async fn evict_older_than(&self, cutoff_ms: i64) -> Vec<String> {
        let mut map = self.inner.write().await;
        let stale: Vec<String> = map
            .values()
            .filter(|e| e.last_seen_ms < cutoff_ms)
            .map(|e| e.node_id.clone())
            .collect();
        for node_id in &stale {
            map.remove(node_id);
        }
        stale
    }

    /// Point-in-time copy. Mutations after the call do not affect it.
    /// Iteration order is not stable across calls.
    pub async fn snapshot(&self) -> Vec<PeerEntry> {
        self.inner.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    #[tokio::test]
    async fn upsert_then_snapshot() {
        let registry = PeerRegistry::new();
        assert!(registry.upsert("a", addr(6000), "f1.txt".into(), 1000).await);

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].node_id, "a");
        assert_eq!(snapshot[0].payload, "f1.txt");
        assert_eq!(snapshot[0].last_seen_ms, 1000);
        assert_eq!(snapshot[0].addr, addr(6000));
    }

    #[tokio::test]
    async fn repeated_upsert_is_idempotent_except_clock() {
        let registry = PeerRegistry::new();
        registry.upsert("a", addr(6000), "f1.txt".into(), 1000).await;
        assert!(!registry.upsert("a", addr(6000), "f1.txt".into(), 1005).await);

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].payload, "f1.txt");
        assert_eq!(snapshot[0].last_seen_ms, 1005);
    }

    #[tokio::test]
    async fn upsert_replaces_the_whole_entry() {
        let registry = PeerRegistry::new();
        registry.upsert("a", addr(6000), "old".into(), 1000).await;
        registry.upsert("a", addr(6001), "new".into(), 2000).await;

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].payload, "new");
        assert_eq!(snapshot[0].addr, addr(6001));
        assert_eq!(snapshot[0].last_seen_ms, 2000);
    }

    #[tokio::test]
    async fn eviction_cutoff_is_strict() {
        let registry = PeerRegistry::new();
        registry.upsert("old", addr(6000), String::new(), 999).await;
        registry.upsert("edge", addr(6001), String::new(), 1000).await;
        registry.upsert("fresh", addr(6002), String::new(), 1001).await;

        let mut evicted = registry.evict_older_than(1000).await;
        evicted.sort();
        assert_eq!(evicted, vec!["old"]);
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn eviction_after_full_timeout_removes_all() {
        let registry = PeerRegistry::new();
        let t0 = 5000;
        let timeout = 30_000;
        registry.upsert("a", addr(6000), String::new(), t0).await;
        registry.upsert("b", addr(6001), String::new(), t0).await;

        let now = t0 + timeout + 1;
        let evicted = registry.evict_older_than(now - timeout).await;
        assert_eq!(evicted.len(), 2);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn refreshed_entries_survive_eviction() {
        let registry = PeerRegistry::new();
        registry.upsert("a", addr(6000), String::new(), 1000).await;
        registry.upsert("b", addr(6001), String::new(), 1000).await;
        registry.upsert("a", addr(6000), String::new(), 40_000).await;

        assert_eq!(registry.evict_older_than(31_001).await, vec!["b"]);
        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].node_id, "a");
    }

    #[tokio::test]
    async fn snapshot_is_isolated_from_later_mutations() {
        let registry = PeerRegistry::new();
        registry.upsert("a", addr(6000), "before".into(), 1000).await;

        let snapshot = registry.snapshot().await;
        registry.upsert("a", addr(6000), "after".into(), 2000).await;
        registry.upsert("b", addr(6001), String::new(), 2000).await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].payload, "before");
    }
}
