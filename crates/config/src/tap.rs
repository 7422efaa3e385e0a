//! Tap server configuration

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Default socket path for the tap server
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/mqscope-tap.sock";

/// Tap server settings
///
/// # Example
///
/// ```toml
/// [tap]
/// socket_path = "/run/mqscope/tap.sock"
/// max_clients = 32
/// queue_capacity = 512
/// heartbeat_interval_secs = 15
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TapSettings {
    /// Unix socket the tap server listens on
    pub socket_path: PathBuf,

    /// Maximum concurrently attached debug clients
    /// Default: 64
    pub max_clients: usize,

    /// Per-client outbound queue capacity
    /// Default: 256
    pub queue_capacity: usize,

    /// Heartbeat interval in seconds
    /// Default: 30
    pub heartbeat_interval_secs: u64,
}

impl Default for TapSettings {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            max_clients: 64,
            queue_capacity: 256,
            heartbeat_interval_secs: 30,
        }
    }
}

impl TapSettings {
    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.max_clients == 0 {
            return Err(ConfigError::invalid_value(
                "tap",
                "max_clients",
                "must be greater than zero",
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::invalid_value(
                "tap",
                "queue_capacity",
                "must be greater than zero",
            ));
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(ConfigError::invalid_value(
                "tap",
                "heartbeat_interval_secs",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}
