//! Error types for the tap crate

use std::io;
use thiserror::Error;

/// Errors that can occur in the tap system
#[derive(Error, Debug)]
pub enum TapError {
    /// I/O error (socket operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Protocol error (malformed frames)
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Maximum clients reached
    #[error("maximum tap clients reached ({max})")]
    MaxClients { max: usize },

    /// Client not found
    #[error("tap client not found: {id}")]
    ClientNotFound { id: u64 },

    /// Channel closed (client disconnected)
    #[error("channel closed")]
    ChannelClosed,

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for tap operations
pub type Result<T> = std::result::Result<T, TapError>;
