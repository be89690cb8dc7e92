//! Node agent role: announce local state on a jittered cadence, listen for
//! aggregate broadcasts, periodically display the last known view.

pub mod localstate;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::Rng;
use tokio::net::UdpSocket;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::config::AgentConfig;
use crate::protocol::{self, Message, MAX_DATAGRAM};

/// Shown by the display loop until the first broadcast arrives.
pub const WAITING_FOR_UPDATES: &str = "waiting for server updates";

/// A running agent instance. Same lifecycle contract as the server handle.
pub struct AgentHandle {
    local_addr: SocketAddr,
    view: Arc<RwLock<String>>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl AgentHandle {
    /// Address of the shared heartbeat/broadcast socket.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The last aggregate view received from the server.
    pub async fn last_view(&self) -> String {
        self.view.read().await.clone()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

/// Bind the socket, resolve the server address and spawn the heartbeat,
/// listener and display tasks.
pub async fn start(config: AgentConfig) -> Result<AgentHandle> {
    let bind = format!("{}:{}", config.bind_host, config.bind_port);
    let socket = UdpSocket::bind(&bind)
        .await
        .with_context(|| format!("failed to bind UDP socket on {bind}"))?;
    let local_addr = socket.local_addr()?;
    let socket = Arc::new(socket);

    let server = (config.server_host.as_str(), config.server_port);
    let server_addr = tokio::net::lookup_host(server)
        .await
        .with_context(|| format!("cannot resolve server address {}:{}", server.0, server.1))?
        .next()
        .with_context(|| format!("no address found for {}", server.0))?;

    let view = Arc::new(RwLock::new(WAITING_FOR_UPDATES.to_string()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tracing::info!(
        node_id = %config.node_id,
        %local_addr,
        %server_addr,
        home_dir = %config.home_dir.display(),
        "agent running"
    );

    let tasks = vec![
        tokio::spawn(heartbeat_loop(
            socket.clone(),
            server_addr,
            config.node_id.clone(),
            config.home_dir.clone(),
            config.heartbeat_jitter_ms,
            shutdown_rx.clone(),
        )),
        tokio::spawn(listener_loop(socket, view.clone(), shutdown_rx.clone())),
        tokio::spawn(display_loop(
            view.clone(),
            config.node_id,
            config.display_interval_ms,
            shutdown_rx,
        )),
    ];

    Ok(AgentHandle {
        local_addr,
        view,
        shutdown: shutdown_tx,
        tasks,
    })
}

/// Sleep a uniform random delay below `jitter_ms`, then send one heartbeat
/// with the current local state. The jitter keeps a fleet of agents from
/// heartbeating in lockstep. Send failures are logged; the next cycle is the
/// retry.
async fn heartbeat_loop(
    socket: Arc<UdpSocket>,
    server_addr: SocketAddr,
    node_id: String,
    home_dir: PathBuf,
    jitter_ms: u64,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let delay = Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms));
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(delay) => {}
        }

        let payload = localstate::describe_local_state(&home_dir);
        let data = protocol::encode(&Message::new(node_id.clone(), payload));
        if data.len() > MAX_DATAGRAM {
            tracing::warn!(
                len = data.len(),
                max = MAX_DATAGRAM,
                "heartbeat exceeds the MTU-safe datagram size, sending anyway"
            );
        }
        match socket.send_to(&data, server_addr).await {
            Ok(_) => tracing::debug!(%server_addr, bytes = data.len(), "sent heartbeat"),
            Err(e) => tracing::warn!(%server_addr, error = %e, "heartbeat send failed"),
        }
    }
}

/// Replace the shared view with each decoded broadcast payload. The whole
/// string is swapped under the lock, so the display loop never reads a
/// partial update. Undecodable datagrams are logged and skipped.
async fn listener_loop(
    socket: Arc<UdpSocket>,
    view: Arc<RwLock<String>>,
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
                match protocol::decode(&buf[..len]) {
                    Ok(msg) => {
                        tracing::debug!(%addr, from = %msg.node_id, bytes = len, "received aggregate view");
                        *view.write().await = msg.payload;
                    }
                    Err(e) => tracing::warn!(%addr, error = %e, "discarding undecodable datagram"),
                }
            }
        }
    }
}

/// Render the last known server view on a fixed period. Never touches the
/// network.
async fn display_loop(
    view: Arc<RwLock<String>>,
    node_id: String,
    interval_ms: u64,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(Duration::from_millis(interval_ms));
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                let current = view.read().await.clone();
                tracing::info!(%node_id, "last known server view:\n{current}");
            }
        }
    }
}
