//! Synthetic node for exercising a running server: sends fixed-payload
//! heartbeats under the usual jitter and prints every broadcast it receives.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::Rng;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nodepulse::config::AgentConfig;
use nodepulse::protocol::{self, Message, MAX_DATAGRAM};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AgentConfig::load()?;
    let node_id = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.node_id.clone());

    let socket = Arc::new(tokio::net::UdpSocket::bind("0.0.0.0:0").await?);
    let server = (config.server_host.as_str(), config.server_port);
    let server_addr = tokio::net::lookup_host(server)
        .await
        .with_context(|| format!("cannot resolve server address {}:{}", server.0, server.1))?
        .next()
        .with_context(|| format!("no address found for {}", server.0))?;

    tracing::info!(%node_id, %server_addr, "probe running");

    let receiver = socket.clone();
    tokio::spawn(async move {
        let mut buf = [0u8; MAX_DATAGRAM];
        loop {
            match receiver.recv_from(&mut buf).await {
                Ok((len, _)) => match protocol::decode(&buf[..len]) {
                    Ok(msg) => println!("--- aggregate view ---\n{}", msg.payload),
                    Err(e) => tracing::warn!(error = %e, "discarding undecodable datagram"),
                },
                Err(e) => tracing::warn!(error = %e, "udp receive failed"),
            }
        }
    });

    loop {
        let delay = Duration::from_millis(rand::thread_rng().gen_range(0..config.heartbeat_jitter_ms));
        tokio::time::sleep(delay).await;

        let msg = Message::new(node_id.clone(), format!("hello from node {node_id}"));
        match socket.send_to(&protocol::encode(&msg), server_addr).await {
            Ok(_) => tracing::info!(%node_id, "sent heartbeat"),
            Err(e) => tracing::warn!(error = %e, "heartbeat send failed"),
        }
    }
}
