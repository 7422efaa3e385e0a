//! Unix socket server for tap connections
//!
//! `TapServer` listens on a Unix socket and handles debug client
//! connections. Each client sends a `Subscribe` frame and then receives
//! every message matching its filter; it may replace the filter
//! mid-session with a `SetFilter` frame.
//!
//! A write error or disconnect is isolated to that client: it drains,
//! unregisters, and closes without touching other clients or the
//! dispatching producers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::OwnedReadHalf;
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info, warn};

use mqscope_filter::FilterExpression;

use crate::error::{Result, TapError};
use crate::protocol::{TapEnvelope, TapMessage, read_length_prefix};
use crate::tap::TapPoint;

/// Default socket path
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/mqscope-tap.sock";

/// Upper bound on inbound frame size
const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Server configuration
#[derive(Debug, Clone)]
pub struct TapServerConfig {
    /// Path to the Unix socket
    pub socket_path: PathBuf,
    /// Heartbeat interval in seconds
    pub heartbeat_interval_secs: u64,
}

impl Default for TapServerConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            heartbeat_interval_secs: 30,
        }
    }
}

impl TapServerConfig {
    /// Create config with custom socket path
    pub fn with_socket_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.socket_path = path.as_ref().to_path_buf();
        self
    }
}

impl From<&mqscope_config::TapSettings> for TapServerConfig {
    fn from(settings: &mqscope_config::TapSettings) -> Self {
        Self {
            socket_path: settings.socket_path.clone(),
            heartbeat_interval_secs: settings.heartbeat_interval_secs,
        }
    }
}

/// Unix socket server for tap connections
pub struct TapServer {
    /// Server configuration
    config: TapServerConfig,
    /// The tap point clients attach to
    tap: Arc<TapPoint>,
}

impl TapServer {
    /// Create a new tap server
    pub fn new(tap: Arc<TapPoint>, config: TapServerConfig) -> Self {
        Self { config, tap }
    }

    /// Create with default configuration
    pub fn with_defaults(tap: Arc<TapPoint>) -> Self {
        Self::new(tap, TapServerConfig::default())
    }

    /// Get the socket path
    pub fn socket_path(&self) -> &Path {
        &self.config.socket_path
    }

    /// Run the server
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        // Remove existing socket file
        if self.config.socket_path.exists() {
            std::fs::remove_file(&self.config.socket_path).map_err(TapError::Io)?;
        }

        // Bind the listener
        let listener = UnixListener::bind(&self.config.socket_path).map_err(TapError::Io)?;

        info!(path = %self.config.socket_path.display(), "tap server listening");

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let tap = Arc::clone(&self.tap);
                    let config = self.config.clone();

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, tap, config).await {
                            debug!(error = %e, "tap connection ended");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "failed to accept tap connection");
                }
            }
        }
    }

    /// Start the server in a background task
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

/// Handle a single client connection
async fn handle_connection(
    mut stream: UnixStream,
    tap: Arc<TapPoint>,
    config: TapServerConfig,
) -> Result<()> {
    debug!("new tap connection");

    // First frame must be a Subscribe
    let frame = read_frame(&mut stream).await?;
    let request = match TapMessage::decode(frame)? {
        TapMessage::Subscribe(req) => req,
        _ => {
            let error_msg = TapMessage::Error("expected Subscribe frame".into());
            stream
                .write_all(&error_msg.encode())
                .await
                .map_err(TapError::Io)?;
            return Err(TapError::Protocol("expected Subscribe frame".into()));
        }
    };

    // Register with the tap point
    let (client, mut receiver) = match tap.subscribe() {
        Ok(pair) => pair,
        Err(e) => {
            let error_msg = TapMessage::Error(e.to_string());
            let _ = stream.write_all(&error_msg.encode()).await;
            return Err(e);
        }
    };
    let client_id = client.id();

    client.set_filter(checked_filter(&request.filter.to_expression(), client_id));
    if let Some(rate) = request.max_messages_per_sec {
        client.set_rate_limit(rate);
    }
    client.activate();

    info!(
        client_id,
        filter = %client.filter_display(),
        rate_limit = ?request.max_messages_per_sec,
        "tap client subscribed"
    );

    // Split so SetFilter frames can arrive while we stream
    let (read_half, mut write_half) = stream.into_split();
    let mut control = tokio::spawn(control_loop(read_half, Arc::clone(&tap), client_id));

    let heartbeat_interval = Duration::from_secs(config.heartbeat_interval_secs);
    let mut heartbeat_timer = tokio::time::interval(heartbeat_interval);

    // Main loop: drain the client queue to the socket
    loop {
        tokio::select! {
            item = receiver.recv() => {
                match item {
                    Some(item) => {
                        let envelope = TapEnvelope::from_item(&item);
                        let encoded = TapMessage::Message(envelope).encode();

                        if let Err(e) = write_half.write_all(&encoded).await {
                            warn!(error = %e, client_id, "failed to send message to client");
                            break;
                        }
                    }
                    None => {
                        // Channel closed (tap point shutting down)
                        break;
                    }
                }
            }

            // Heartbeat timer
            _ = heartbeat_timer.tick() => {
                let msg = TapMessage::Heartbeat;
                if let Err(e) = write_half.write_all(&msg.encode()).await {
                    debug!(error = %e, client_id, "failed to send heartbeat");
                    break;
                }
            }

            // Read side closed or errored
            _ = &mut control => break,
        }
    }

    // Clean up
    control.abort();
    let _ = tap.unsubscribe(client_id);
    info!(client_id, "tap client disconnected");

    Ok(())
}

/// Consume control frames from the client until disconnect
async fn control_loop(mut read_half: OwnedReadHalf, tap: Arc<TapPoint>, client_id: u64) {
    loop {
        let frame = match read_frame(&mut read_half).await {
            Ok(frame) => frame,
            Err(_) => break,
        };

        match TapMessage::decode(frame) {
            Ok(TapMessage::SetFilter(spec)) => {
                let filter = checked_filter(&spec.to_expression(), client_id);
                debug!(client_id, filter = %filter, "replacing client filter");
                if tap.set_filter(client_id, filter).is_err() {
                    break;
                }
            }
            Ok(_) => {
                debug!(client_id, "ignoring unexpected frame from client");
            }
            Err(e) => {
                debug!(error = %e, client_id, "bad frame from client");
                break;
            }
        }
    }
}

/// Log unparseable clauses; the filter is installed fail-closed regardless
fn checked_filter(filter: &FilterExpression, client_id: u64) -> FilterExpression {
    let invalid = filter.clauses().iter().filter(|c| !c.is_valid()).count();
    if invalid > 0 {
        warn!(
            client_id,
            invalid,
            filter = %filter,
            "filter has unparseable clauses; they match nothing"
        );
    }
    filter.clone()
}

/// Read one length-prefixed frame
async fn read_frame<R: AsyncRead + Unpin>(stream: &mut R) -> Result<Bytes> {
    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .await
        .map_err(TapError::Io)?;

    let frame_len = read_length_prefix(&len_buf)
        .ok_or_else(|| TapError::Protocol("invalid length prefix".into()))?
        as usize;
    if frame_len > MAX_FRAME_LEN {
        return Err(TapError::Protocol(format!("frame too large: {frame_len}")));
    }

    let mut buf = BytesMut::with_capacity(frame_len);
    buf.resize(frame_len, 0);
    stream.read_exact(&mut buf).await.map_err(TapError::Io)?;

    Ok(buf.freeze())
}

#[cfg(test)]
#[path = "server_test.rs"]
mod tests;
