//! Broadcast aggregator: periodic aggregate view sent to every known node.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::time::interval;

use crate::protocol::{self, Message, MAX_DATAGRAM, SERVER_NODE_ID};
use crate::registry::PeerRegistry;

pub(super) async fn run(
    socket: Arc<UdpSocket>,
    registry: PeerRegistry,
    interval_ms: u64,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(Duration::from_millis(interval_ms));
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => broadcast_once(&socket, &registry).await,
        }
    }
}

/// Serialize the registry snapshot once and send the same datagram to every
/// return address. Each destination send stands alone: a dead address is
/// logged and the rest still go out.
async fn broadcast_once(socket: &UdpSocket, registry: &PeerRegistry) {
    let peers = registry.snapshot().await;
    if peers.is_empty() {
        tracing::debug!("no active nodes, skipping broadcast");
        return;
    }

    let mut combined = String::new();
    for entry in &peers {
        combined.push_str(&entry.node_id);
        combined.push_str("::");
        combined.push_str(&entry.payload);
        combined.push('\n');
    }

    let data = protocol::encode(&Message::new(SERVER_NODE_ID, combined));
    if data.len() > MAX_DATAGRAM {
        tracing::warn!(
            len = data.len(),
            max = MAX_DATAGRAM,
            "broadcast exceeds the MTU-safe datagram size, sending anyway"
        );
    }

    let mut sent = 0usize;
    for entry in &peers {
        match socket.send_to(&data, entry.addr).await {
            Ok(_) => sent += 1,
            Err(e) => {
                tracing::warn!(node_id = %entry.node_id, addr = %entry.addr, error = %e, "broadcast send failed");
            }
        }
    }
    tracing::info!(nodes = peers.len(), sent, bytes = data.len(), "broadcast aggregate view");
}
