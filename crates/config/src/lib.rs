//! mqscope Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use mqscope_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[tap]\nmax_clients = 8").unwrap();
//! assert_eq!(config.tap.max_clients, 8);
//! ```
//!
//! # Example Full Config
//!
//! ```toml
//! [log]
//! level = "debug"
//! format = "console"
//!
//! [tap]
//! socket_path = "/run/mqscope/tap.sock"
//! max_clients = 32
//! queue_capacity = 512
//! heartbeat_interval_secs = 15
//! ```

mod error;
mod logging;
mod tap;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use tap::{DEFAULT_SOCKET_PATH, TapSettings};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Tap server settings
    pub tap: TapSettings,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, contains invalid TOML, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_str(&contents)
    }

    /// Validate the loaded configuration
    pub fn validate(&self) -> Result<()> {
        self.tap.validate()
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
