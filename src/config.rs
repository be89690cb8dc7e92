use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigError;

/// Server role configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    #[serde(default = "default_server_port")]
    pub bind_port: u16,

    /// Port for the HTTP inspection endpoint. 0 picks an ephemeral port.
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Liveness sweep period.
    #[serde(default = "default_period_ms")]
    pub sweep_interval_ms: u64,

    /// Aggregate broadcast period. Runs on its own phase, independent of
    /// the sweep.
    #[serde(default = "default_period_ms")]
    pub broadcast_interval_ms: u64,

    /// Silence after which a node is considered dead.
    #[serde(default = "default_period_ms")]
    pub liveness_timeout_ms: u64,
}

/// Node agent role configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_server_host")]
    pub server_host: String,

    #[serde(default = "default_server_port")]
    pub server_port: u16,

    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    /// Local port for heartbeats out and broadcasts in. 0 picks an
    /// ephemeral port.
    #[serde(default = "default_agent_port")]
    pub bind_port: u16,

    #[serde(default = "default_node_id")]
    pub node_id: String,

    /// Directory whose listing becomes the heartbeat payload.
    #[serde(default = "default_home_dir")]
    pub home_dir: PathBuf,

    /// Upper bound of the uniform random delay between heartbeats.
    #[serde(default = "default_period_ms")]
    pub heartbeat_jitter_ms: u64,

    /// Period of the local view display.
    #[serde(default = "default_period_ms")]
    pub display_interval_ms: u64,
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    5000
}

fn default_agent_port() -> u16 {
    6000
}

fn default_http_port() -> u16 {
    9090
}

fn default_node_id() -> String {
    "node-1".to_string()
}

fn default_home_dir() -> PathBuf {
    PathBuf::from("./home")
}

fn default_period_ms() -> u64 {
    30_000
}

fn load_sources() -> Result<config::Config, ConfigError> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    Ok(config::Config::builder()
        .add_source(config::File::with_name("nodepulse").required(false))
        .add_source(config::Environment::with_prefix("NODEPULSE"))
        .build()?)
}

impl ServerConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let settings: ServerConfig = load_sources()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("sweep_interval_ms", self.sweep_interval_ms),
            ("broadcast_interval_ms", self.broadcast_interval_ms),
            ("liveness_timeout_ms", self.liveness_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    key,
                    reason: "must be positive".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: default_bind_host(),
            bind_port: default_server_port(),
            http_port: default_http_port(),
            sweep_interval_ms: default_period_ms(),
            broadcast_interval_ms: default_period_ms(),
            liveness_timeout_ms: default_period_ms(),
        }
    }
}

impl AgentConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let settings: AgentConfig = load_sources()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.node_id.is_empty() {
            return Err(ConfigError::Invalid {
                key: "node_id",
                reason: "must not be empty".to_string(),
            });
        }
        for (key, value) in [
            ("heartbeat_jitter_ms", self.heartbeat_jitter_ms),
            ("display_interval_ms", self.display_interval_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    key,
                    reason: "must be positive".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            server_host: default_server_host(),
            server_port: default_server_port(),
            bind_host: default_bind_host(),
            bind_port: default_agent_port(),
            node_id: default_node_id(),
            home_dir: default_home_dir(),
            heartbeat_jitter_ms: default_period_ms(),
            display_interval_ms: default_period_ms(),
        }
    }
}
