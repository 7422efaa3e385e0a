//! mqscope tap - live streaming of filtered MQTT traffic (Unix only)
//!
//! This crate is the fan-out side of mqscope: every message observed on
//! the publish/subscribe path is offered to the tap point, which evaluates
//! each attached debug client's filter and forwards matches through that
//! client's bounded queue. A stalled client drops its own traffic; it can
//! never apply backpressure to the live message path.
//!
//! **Note:** The socket server only compiles on Unix platforms (Linux,
//! macOS) as it uses Unix domain sockets for IPC.
//!
//! # Architecture
//!
//! ```text
//! publish/subscribe hook
//!     │
//!     ├──→ Arc::new(message)
//!     │         │
//!     │         ▼
//!     │     TapPoint ── RuleEngine (highlights) ── HighlightRegistry
//!     │         │
//!     │         ▼
//!     │   ClientRegistry ◄── per-client FilterExpression + rules
//!     │         │
//!     │         ▼
//!     │   TapClient queues (bounded, drop-newest)
//!     │         │
//!     │         ▼
//!     │     TapServer (Unix socket)
//!     │         │
//!     └──→──────┼──→ debug clients
//! ```

#[cfg(unix)]
pub mod client;
#[cfg(unix)]
mod error;
#[cfg(unix)]
pub mod protocol;
#[cfg(unix)]
pub mod server;
#[cfg(unix)]
pub mod tap;

#[cfg(unix)]
pub use client::{ClientRegistry, ClientState, TapClient, TapItem};
#[cfg(unix)]
pub use error::TapError;
#[cfg(unix)]
pub use protocol::{FilterSpec, SubscribeRequest, TapEnvelope, TapMessage};
#[cfg(unix)]
pub use server::{TapServer, TapServerConfig};
#[cfg(unix)]
pub use tap::{TapPoint, TapStats};
