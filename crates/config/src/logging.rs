//! Logging configuration
//!
//! Controls the internal logging behavior of mqscope.

use serde::Deserialize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::error::{ConfigError, Result};

/// Log level
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level - very verbose
    Trace,
    /// Debug level - debugging information
    Debug,
    /// Info level - normal operation (default)
    #[default]
    Info,
    /// Warn level - warnings only
    Warn,
    /// Error level - errors only
    Error,
}

impl LogLevel {
    /// Convert to tracing level filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable console output (default)
    #[default]
    Console,
    /// JSON structured logging
    Json,
}

/// Log output destination
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Write to stdout (default)
    #[default]
    Stdout,
    /// Write to stderr
    Stderr,
    /// Write to a file
    #[serde(untagged)]
    File(String),
}

/// Logging configuration
///
/// # Example
///
/// ```toml
/// [log]
/// level = "info"
/// format = "console"
/// output = "stdout"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    /// Default: info
    pub level: LogLevel,

    /// Output format (console, json)
    /// Default: console
    pub format: LogFormat,

    /// Output destination (stdout, stderr, or file path)
    /// Default: stdout
    pub output: LogOutput,
}

impl LogConfig {
    /// Initialize the tracing subscriber from this configuration
    ///
    /// `RUST_LOG`-style directives in the configured level are honored via
    /// the env-filter syntax (e.g. `"info,mqscope_tap=debug"`).
    ///
    /// # Errors
    ///
    /// Returns an error if the log file cannot be opened or a subscriber
    /// is already installed.
    pub fn init(&self) -> Result<()> {
        let filter = EnvFilter::try_new(self.level.as_str())
            .or_else(|_| EnvFilter::try_new("info"))
            .map_err(|e| ConfigError::LogInit(e.to_string()))?;

        let registry = tracing_subscriber::registry().with(filter);

        let result = match (self.format, &self.output) {
            (LogFormat::Console, LogOutput::Stdout) => registry
                .with(fmt::layer().with_target(true))
                .try_init(),
            (LogFormat::Console, LogOutput::Stderr) => registry
                .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
                .try_init(),
            (LogFormat::Json, LogOutput::Stdout) => {
                registry.with(fmt::layer().json()).try_init()
            }
            (LogFormat::Json, LogOutput::Stderr) => registry
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init(),
            (format, LogOutput::File(path)) => {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| ConfigError::IoError {
                        path: path.clone(),
                        source: e,
                    })?;
                let writer = std::sync::Mutex::new(file);
                match format {
                    LogFormat::Console => registry
                        .with(fmt::layer().with_target(true).with_ansi(false).with_writer(writer))
                        .try_init(),
                    LogFormat::Json => {
                        registry.with(fmt::layer().json().with_writer(writer)).try_init()
                    }
                }
            }
        };

        result.map_err(|e| ConfigError::LogInit(e.to_string()))
    }
}
