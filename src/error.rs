use thiserror::Error;

/// Decode failures for a single datagram.
///
/// Always recoverable: receivers log the error, drop the datagram and keep
/// listening. The next heartbeat or broadcast cycle carries fresh state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("datagram truncated reading {field}: {needed} more byte(s) required")]
    Truncated { field: &'static str, needed: usize },

    #[error("malformed {field}: {reason}")]
    Malformed { field: &'static str, reason: String },
}

/// Startup configuration problems. Fatal before any loop starts; never
/// occurs mid-run since configuration is immutable after load.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
