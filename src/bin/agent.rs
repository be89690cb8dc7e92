use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nodepulse::agent;
use nodepulse::config::AgentConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting NodePulse agent");

    let config = AgentConfig::load()?;
    tracing::info!(
        node_id = %config.node_id,
        server = %format!("{}:{}", config.server_host, config.server_port),
        "Configuration loaded"
    );

    let handle = agent::start(config).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    handle.shutdown().await;

    Ok(())
}
