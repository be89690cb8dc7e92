use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nodepulse::config::ServerConfig;
use nodepulse::server;

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

    tracing::info!("Starting NodePulse server");

    let config = ServerConfig::load()?;
    tracing::info!(
        bind_port = config.bind_port,
        http_port = config.http_port,
        liveness_timeout_ms = config.liveness_timeout_ms,
        "Configuration loaded"
    );

    let handle = server::start(config).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    handle.shutdown().await;

    Ok(())
}
