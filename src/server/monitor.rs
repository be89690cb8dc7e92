//! Liveness monitor: periodic eviction sweep over the registry.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::interval;

use crate::protocol::now_ms;
use crate::registry::PeerRegistry;

/// Evict every node silent for longer than `timeout_ms`, once per
/// `sweep_interval_ms`. Both clocks are the server's own; a node missing one
/// full timeout window is dead regardless of what its own clock claimed.
pub(super) async fn run(
    registry: PeerRegistry,
    sweep_interval_ms: u64,
    timeout_ms: u64,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(Duration::from_millis(sweep_interval_ms));
    // the first tick fires immediately; skip it so the first sweep happens
    // one full period after startup
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                let cutoff = now_ms() - timeout_ms as i64;
                let evicted = registry.evict_older_than(cutoff).await;
                if evicted.is_empty() {
                    continue;
                }
                for node_id in &evicted {
                    tracing::info!(%node_id, "node inactive, evicted");
                }
                let remaining = registry.len().await;
                tracing::info!(evicted = evicted.len(), remaining, "sweep complete");
            }
        }
    }
}
