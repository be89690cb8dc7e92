//! Server role: receive heartbeats, track liveness, broadcast the aggregate
//! view back to every known node.

mod broadcast;
mod http;
mod monitor;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::ServerConfig;
use crate::protocol::{self, MAX_DATAGRAM};
use crate::registry::PeerRegistry;

/// A running server instance.
///
/// Call [`ServerHandle::shutdown`] to stop every task and wait for them;
/// dropping the handle also stops the tasks, without waiting.
pub struct ServerHandle {
    local_addr: SocketAddr,
    http_addr: SocketAddr,
    registry: PeerRegistry,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    /// Address of the UDP socket heartbeats arrive on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Address of the HTTP inspection endpoint.
    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

/// Bind the socket and spawn the receive, monitor, broadcast and inspection
/// tasks.
pub async fn start(config: ServerConfig) -> Result<ServerHandle> {
    let bind = format!("{}:{}", config.bind_host, config.bind_port);
    let socket = UdpSocket::bind(&bind)
        .await
        .with_context(|| format!("failed to bind UDP socket on {bind}"))?;
    let local_addr = socket.local_addr()?;
    let socket = Arc::new(socket);
    let registry = PeerRegistry::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tracing::info!(%local_addr, "server listening");

    let mut tasks = Vec::new();
    tasks.push(tokio::spawn(recv_loop(
        socket.clone(),
        registry.clone(),
        shutdown_rx.clone(),
    )));
    tasks.push(tokio::spawn(monitor::run(
        registry.clone(),
        config.sweep_interval_ms,
        config.liveness_timeout_ms,
        shutdown_rx.clone(),
    )));
    tasks.push(tokio::spawn(broadcast::run(
        socket,
        registry.clone(),
        config.broadcast_interval_ms,
        shutdown_rx.clone(),
    )));
    let (http_addr, http_task) = http::spawn(registry.clone(), config.http_port, shutdown_rx)?;
    tasks.push(http_task);

    Ok(ServerHandle {
        local_addr,
        http_addr,
        registry,
        shutdown: shutdown_tx,
        tasks,
    })
}

/// Decode incoming datagrams and record them in the registry. Undecodable
/// datagrams and receive errors are logged and never stop the loop.
async fn recv_loop(
    socket: Arc<UdpSocket>,
    registry: PeerRegistry,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut buf = [0u8; MAX_DATAGRAM];
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            recv = socket.recv_from(&mut buf) => {
                let (len, addr) = match recv {
                    Ok(received) => received,
                    Err(e) => {
                        tracing::warn!(error = %e, "udp receive failed");
                        continue;
                    }
                };
                let msg = match protocol::decode(&buf[..len]) {
                    Ok(msg) => msg,
                    Err(e) => {
                        tracing::warn!(%addr, error = %e, "discarding undecodable datagram");
                        continue;
                    }
                };
                // the receipt clock, not msg.timestamp, drives liveness
                let seen_at = protocol::now_ms();
                let is_new = registry
                    .upsert(&msg.node_id, addr, msg.payload, seen_at)
                    .await;
                if is_new {
                    let count = registry.len().await;
                    tracing::info!(node_id = %msg.node_id, %addr, peers_count = count, "discovered node");
                } else {
                    tracing::debug!(node_id = %msg.node_id, %addr, sender_ts = msg.timestamp, "heartbeat");
                }
            }
        }
    }
}
