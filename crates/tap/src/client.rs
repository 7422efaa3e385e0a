//! Tap client management and fan-out
//!
//! Each attached debug client gets a `TapClient` that tracks:
//! - Unique ID and lifecycle state (`Connecting → Active → Draining → Closed`)
//! - Its filter expression (default: match everything)
//! - An optional client-scoped rule engine
//! - A bounded channel sender for message delivery
//!
//! The `ClientRegistry` handles registration, removal, and per-message
//! dispatch. Dispatch never blocks: delivery is `try_send` with a
//! drop-newest overflow policy, applied uniformly, so a stalled consumer
//! loses its own traffic instead of stalling the producer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU32, AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::trace;

use mqscope_filter::FilterExpression;
use mqscope_protocol::Message;
use mqscope_rules::{HighlightInfo, HighlightRegistry, RuleEngine};

use crate::error::{Result, TapError};

/// Counter for generating unique client IDs
static CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Default maximum number of concurrently attached clients
pub const DEFAULT_MAX_CLIENTS: usize = 64;

/// Default per-client outbound queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Lifecycle state of a tap client
///
/// Transitions are monotonic: a state can only move forward, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClientState {
    /// Registered, handshake in progress - not yet eligible for messages
    Connecting = 0,
    /// Eligible to receive forwarded messages
    Active = 1,
    /// Disconnecting - no new messages admitted, queue drains
    Draining = 2,
    /// Terminal - removed from the registry
    Closed = 3,
}

impl ClientState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Active,
            2 => Self::Draining,
            _ => Self::Closed,
        }
    }
}

/// The unit handed to a client's outbound queue
///
/// Pairs the matched message with its highlight info, resolved at dispatch
/// time - this is the boundary the renderer/transport consumes.
#[derive(Debug, Clone)]
pub struct TapItem {
    /// The matched message
    pub message: Arc<Message>,
    /// Highlight attached by rule actions, if any
    pub highlight: Option<HighlightInfo>,
}

/// A single attached debug client
#[derive(Debug)]
pub struct TapClient {
    /// Unique identifier
    id: u64,
    /// Lifecycle state
    state: AtomicU8,
    /// Filter criteria (default: match everything)
    filter: RwLock<FilterExpression>,
    /// Optional client-scoped rules, evaluated on this client's matches
    rules: RwLock<Option<Arc<RuleEngine>>>,
    /// Channel sender for message delivery
    sender: mpsc::Sender<TapItem>,
    /// Max messages per second (0 = unlimited)
    rate_limit: AtomicU32,
    /// Counter for rate limiting, reset every second
    sent_this_second: AtomicU64,
    /// Total items delivered
    sent: AtomicU64,
    /// Total items dropped by the overflow policy
    dropped: AtomicU64,
}

impl TapClient {
    fn new(sender: mpsc::Sender<TapItem>) -> Self {
        Self {
            id: CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
            state: AtomicU8::new(ClientState::Connecting as u8),
            filter: RwLock::new(FilterExpression::new()),
            rules: RwLock::new(None),
            sender,
            rate_limit: AtomicU32::new(0),
            sent_this_second: AtomicU64::new(0),
            sent: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Get the client ID
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the current lifecycle state
    #[inline]
    pub fn state(&self) -> ClientState {
        ClientState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Advance the state, refusing to move backwards
    fn advance(&self, target: ClientState) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current >= target as u8 {
                return false;
            }
            match self.state.compare_exchange_weak(
                current,
                target as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    /// Transition to `Active` after the subscribe handshake
    pub fn activate(&self) -> bool {
        self.advance(ClientState::Active)
    }

    /// Transition to `Draining` - no new messages admitted
    pub fn begin_drain(&self) -> bool {
        self.advance(ClientState::Draining)
    }

    /// Transition to the terminal `Closed` state
    pub fn close(&self) -> bool {
        self.advance(ClientState::Closed)
    }

    /// Replace the filter expression
    pub fn set_filter(&self, filter: FilterExpression) {
        *self.filter.write() = filter;
    }

    /// Render the current filter for logging
    pub fn filter_display(&self) -> String {
        self.filter.read().to_string()
    }

    /// Attach a client-scoped rule engine
    pub fn set_rules(&self, rules: Arc<RuleEngine>) {
        *self.rules.write() = Some(rules);
    }

    /// Set the delivery rate limit (0 = unlimited)
    pub fn set_rate_limit(&self, max_per_sec: u32) {
        self.rate_limit.store(max_per_sec, Ordering::Relaxed);
    }

    /// Check if a message passes this client's filter
    #[inline]
    pub fn matches(&self, message: &Message) -> bool {
        self.filter.read().matches(message)
    }

    /// Check rate limit, counting this delivery attempt
    #[inline]
    fn within_rate_limit(&self) -> bool {
        let max = self.rate_limit.load(Ordering::Relaxed);
        if max == 0 {
            return true;
        }
        self.sent_this_second.fetch_add(1, Ordering::Relaxed) < u64::from(max)
    }

    /// Reset the rate limit counter (called every second)
    #[inline]
    pub fn reset_rate_counter(&self) {
        self.sent_this_second.store(0, Ordering::Relaxed);
    }

    /// Offer an item to this client - never blocks
    ///
    /// Admits only in `Active` state. A full queue drops the new item
    /// (drop-newest) and counts it; the queue never grows past capacity.
    pub fn deliver(&self, item: TapItem) -> bool {
        if self.state() != ClientState::Active {
            return false;
        }
        if !self.within_rate_limit() {
            return false;
        }
        match self.sender.try_send(item) {
            Ok(()) => {
                self.sent.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Check if the consumer side is still attached
    #[inline]
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Total items delivered to this client
    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Total items dropped by the overflow policy
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Manages all attached clients
#[derive(Debug)]
pub struct ClientRegistry {
    /// Attached clients, in registration order
    clients: RwLock<Vec<Arc<TapClient>>>,
    /// Maximum concurrent clients
    max_clients: usize,
    /// Outbound queue capacity per client
    queue_capacity: usize,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientRegistry {
    /// Create a registry with default limits
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_CLIENTS, DEFAULT_QUEUE_CAPACITY)
    }

    /// Create a registry with explicit limits
    pub fn with_limits(max_clients: usize, queue_capacity: usize) -> Self {
        Self {
            clients: RwLock::new(Vec::new()),
            max_clients,
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Register a new client in `Connecting` state
    ///
    /// Returns the client handle and the receiver its consumer drains.
    pub fn register(&self) -> Result<(Arc<TapClient>, mpsc::Receiver<TapItem>)> {
        let mut clients = self.clients.write();

        if clients.len() >= self.max_clients {
            return Err(TapError::MaxClients {
                max: self.max_clients,
            });
        }

        let (sender, receiver) = mpsc::channel(self.queue_capacity);
        let client = Arc::new(TapClient::new(sender));
        clients.push(Arc::clone(&client));

        Ok((client, receiver))
    }

    /// Find a client by ID
    pub fn get(&self, id: u64) -> Option<Arc<TapClient>> {
        self.clients
            .read()
            .iter()
            .find(|c| c.id == id)
            .map(Arc::clone)
    }

    /// Replace a client's filter
    pub fn set_filter(&self, id: u64, filter: FilterExpression) -> Result<()> {
        let client = self.get(id).ok_or(TapError::ClientNotFound { id })?;
        client.set_filter(filter);
        Ok(())
    }

    /// Attach a client-scoped rule engine
    pub fn set_rules(&self, id: u64, rules: Arc<RuleEngine>) -> Result<()> {
        let client = self.get(id).ok_or(TapError::ClientNotFound { id })?;
        client.set_rules(rules);
        Ok(())
    }

    /// Activate a client after its subscribe handshake
    pub fn activate(&self, id: u64) -> Result<()> {
        let client = self.get(id).ok_or(TapError::ClientNotFound { id })?;
        client.activate();
        Ok(())
    }

    /// Remove a client: Draining, out of the registry, then Closed
    ///
    /// Items already queued still drain to the consumer. Dispatch
    /// iterations that hold the client concurrently observe the state
    /// change and skip it.
    pub fn unregister(&self, id: u64) -> Result<()> {
        let removed = {
            let mut clients = self.clients.write();
            let index = clients.iter().position(|c| c.id == id);
            index.map(|i| clients.remove(i))
        };

        match removed {
            Some(client) => {
                client.begin_drain();
                client.close();
                Ok(())
            }
            None => Err(TapError::ClientNotFound { id }),
        }
    }

    /// Number of attached clients
    pub fn count(&self) -> usize {
        self.clients.read().len()
    }

    /// Check if any clients are attached
    #[inline]
    pub fn has_clients(&self) -> bool {
        !self.clients.read().is_empty()
    }

    /// Dispatch a message to every matching active client
    ///
    /// Safe to call from multiple producer contexts concurrently. The
    /// registry lock is released before any queue push: dispatch works on
    /// a snapshot of the client list, so registration changes mid-dispatch
    /// are observed as either fully before or fully after.
    ///
    /// Returns the number of clients that accepted the item.
    pub fn dispatch(
        &self,
        message: &Arc<Message>,
        highlights: Option<&HighlightRegistry>,
    ) -> usize {
        let snapshot: Vec<Arc<TapClient>> = self.clients.read().clone();
        let mut sent_count = 0;

        for client in &snapshot {
            if client.state() != ClientState::Active {
                continue;
            }
            if !client.matches(message) {
                continue;
            }

            // Client-scoped rules run only on this client's matches
            let client_rules = client.rules.read().clone();
            if let Some(rules) = client_rules {
                rules.evaluate(message);
            }

            let highlight = highlights.and_then(|h| h.get(message));
            if client.deliver(TapItem {
                message: Arc::clone(message),
                highlight,
            }) {
                sent_count += 1;
            } else {
                trace!(client = client.id, "tap item not admitted");
            }
        }

        sent_count
    }

    /// Remove clients whose consumer has gone away
    pub fn cleanup_disconnected(&self) -> usize {
        let mut clients = self.clients.write();
        let before = clients.len();
        clients.retain(|c| {
            if c.is_connected() {
                true
            } else {
                c.begin_drain();
                c.close();
                false
            }
        });
        before - clients.len()
    }

    /// Reset rate limit counters for all clients
    pub fn reset_rate_counters(&self) {
        let clients = self.clients.read();
        for client in clients.iter() {
            client.reset_rate_counter();
        }
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
