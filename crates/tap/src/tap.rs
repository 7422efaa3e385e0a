//! TapPoint - the hot-path entry for live streaming
//!
//! `TapPoint` is the integration point between the publish/subscribe hooks
//! and the tap distribution system. One `tap()` call per observed message:
//! global rules are evaluated first (so highlights are registered), then
//! the message is offered to every attached client's filter.
//!
//! Fan-out costs nothing when no clients are attached - an atomic flag
//! short-circuits before any filter work.
//!
//! # Usage
//!
//! ```ignore
//! let tap = Arc::new(TapPoint::new().with_rules(rules));
//!
//! // In the publish/subscribe hook:
//! tap.tap(Arc::new(message));
//!
//! // For new debug connections:
//! let (client, rx) = tap.subscribe()?;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, trace};

use mqscope_filter::FilterExpression;
use mqscope_protocol::Message;
use mqscope_rules::{HighlightRegistry, RuleEngine};

use crate::client::{ClientRegistry, TapClient, TapItem};
use crate::error::Result;

/// Interval for rate limit counter reset
const RATE_LIMIT_RESET_INTERVAL: Duration = Duration::from_secs(1);

/// Interval for cleanup of disconnected clients and highlight pruning
const CLEANUP_INTERVAL: Duration = Duration::from_secs(5);

/// The main tap point for live streaming
#[derive(Debug)]
pub struct TapPoint {
    /// Client registry
    clients: ClientRegistry,
    /// Global rules, evaluated on every message
    rules: Option<Arc<RuleEngine>>,
    /// Highlight associations consulted at dispatch time
    highlights: Arc<HighlightRegistry>,
    /// Quick check flag for the hot path
    has_clients: AtomicBool,
    /// Total messages offered while clients were attached
    tap_count: AtomicU64,
    /// Total items accepted into client queues
    sent_count: AtomicU64,
}

impl TapPoint {
    /// Create a tap point with default limits and no global rules
    pub fn new() -> Self {
        Self {
            clients: ClientRegistry::new(),
            rules: None,
            highlights: Arc::new(HighlightRegistry::new()),
            has_clients: AtomicBool::new(false),
            tap_count: AtomicU64::new(0),
            sent_count: AtomicU64::new(0),
        }
    }

    /// Use explicit client/queue limits
    pub fn with_limits(mut self, max_clients: usize, queue_capacity: usize) -> Self {
        self.clients = ClientRegistry::with_limits(max_clients, queue_capacity);
        self
    }

    /// Create a tap point sized from configuration
    pub fn from_settings(settings: &mqscope_config::TapSettings) -> Self {
        Self::new().with_limits(settings.max_clients, settings.queue_capacity)
    }

    /// Attach a global rule engine, evaluated on every observed message
    pub fn with_rules(mut self, rules: Arc<RuleEngine>) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Share an existing highlight registry
    pub fn with_highlights(mut self, highlights: Arc<HighlightRegistry>) -> Self {
        self.highlights = highlights;
        self
    }

    /// Offer a message for streaming
    ///
    /// This is the hot path, called once per observed packet from any
    /// producer context. Global rules always run (a highlight must stick
    /// even if no debug client is currently attached); fan-out
    /// short-circuits on the atomic flag when no one is listening.
    pub fn tap(&self, message: Arc<Message>) {
        if let Some(rules) = &self.rules {
            rules.evaluate(&message);
        }

        // Fast path: no clients = no fan-out work
        if !self.has_clients.load(Ordering::Relaxed) {
            return;
        }

        self.tap_count.fetch_add(1, Ordering::Relaxed);

        let sent = self.clients.dispatch(&message, Some(&self.highlights));
        if sent > 0 {
            self.sent_count.fetch_add(sent as u64, Ordering::Relaxed);
            trace!(sent, topic = %message.topic(), "tapped message to clients");
        }
    }

    /// Register a new debug client
    ///
    /// The client starts in `Connecting` state with a match-all filter;
    /// call `activate` once its handshake completes.
    pub fn subscribe(&self) -> Result<(Arc<TapClient>, mpsc::Receiver<TapItem>)> {
        let (client, receiver) = self.clients.register()?;

        self.has_clients.store(true, Ordering::Relaxed);
        debug!(id = client.id(), "new tap client");

        Ok((client, receiver))
    }

    /// Activate a client after its subscribe handshake
    pub fn activate(&self, id: u64) -> Result<()> {
        self.clients.activate(id)
    }

    /// Replace a client's filter
    pub fn set_filter(&self, id: u64, filter: FilterExpression) -> Result<()> {
        self.clients.set_filter(id, filter)
    }

    /// Attach a client-scoped rule engine
    pub fn set_rules(&self, id: u64, rules: Arc<RuleEngine>) -> Result<()> {
        self.clients.set_rules(id, rules)
    }

    /// Remove a client
    pub fn unsubscribe(&self, id: u64) -> Result<()> {
        self.clients.unregister(id)?;

        if !self.clients.has_clients() {
            self.has_clients.store(false, Ordering::Relaxed);
        }

        debug!(id, "tap client removed");
        Ok(())
    }

    /// Number of attached clients
    pub fn client_count(&self) -> usize {
        self.clients.count()
    }

    /// Check if any clients are attached
    #[inline]
    pub fn has_clients(&self) -> bool {
        self.has_clients.load(Ordering::Relaxed)
    }

    /// The highlight registry consulted at dispatch time
    pub fn highlights(&self) -> &Arc<HighlightRegistry> {
        &self.highlights
    }

    /// Get tap statistics
    pub fn stats(&self) -> TapStats {
        TapStats {
            tap_count: self.tap_count.load(Ordering::Relaxed),
            sent_count: self.sent_count.load(Ordering::Relaxed),
            client_count: self.clients.count(),
        }
    }

    /// Clean up disconnected clients
    ///
    /// Called periodically by the maintenance task.
    pub fn cleanup(&self) -> usize {
        let removed = self.clients.cleanup_disconnected();

        if removed > 0 {
            debug!(removed, "cleaned up disconnected tap clients");

            if !self.clients.has_clients() {
                self.has_clients.store(false, Ordering::Relaxed);
            }
        }

        removed
    }

    /// Spawn the maintenance task
    ///
    /// Handles rate limit counter resets (every second), disconnected
    /// client cleanup, and highlight table pruning (every 5 seconds).
    pub fn spawn_maintenance(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let tap = Arc::clone(self);

        tokio::spawn(async move {
            let mut rate_interval = tokio::time::interval(RATE_LIMIT_RESET_INTERVAL);
            let mut cleanup_interval = tokio::time::interval(CLEANUP_INTERVAL);

            loop {
                tokio::select! {
                    _ = rate_interval.tick() => {
                        tap.clients.reset_rate_counters();
                    }
                    _ = cleanup_interval.tick() => {
                        tap.cleanup();
                        tap.highlights.prune();
                    }
                }
            }
        })
    }
}

impl Default for TapPoint {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the tap point
#[derive(Debug, Clone, Copy)]
pub struct TapStats {
    /// Messages offered while clients were attached
    pub tap_count: u64,
    /// Items accepted into client queues
    pub sent_count: u64,
    /// Current number of clients
    pub client_count: usize,
}

#[cfg(test)]
#[path = "tap_test.rs"]
mod tests;
