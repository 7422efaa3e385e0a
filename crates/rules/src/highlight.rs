//! Highlight registry - weak message-scoped associations
//!
//! Maps message identity to highlight info without extending the
//! message's lifetime. Each entry holds a `Weak<Message>`; once every
//! strong reference to a message is gone (e.g. it rotated out of the
//! history buffer), its entry is dead and gets swept by `prune`.
//!
//! Keys are the message allocation address. The held `Weak` pins the
//! allocation, so an address cannot be reused while its entry lives -
//! keys stay unambiguous without any id handshake with the owner.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use mqscope_protocol::Message;

use crate::action::HighlightInfo;

/// Prune is triggered when the table grows past this many entries
const PRUNE_FLOOR: usize = 64;

/// Weak side table from message identity to highlight info
///
/// Safe for concurrent writes from rule actions and concurrent reads from
/// renderers.
#[derive(Debug, Default)]
pub struct HighlightRegistry {
    inner: RwLock<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    entries: HashMap<usize, Entry>,
    /// Table size at which the next amortized prune fires
    prune_at: usize,
}

#[derive(Debug)]
struct Entry {
    target: Weak<Message>,
    info: HighlightInfo,
}

fn key_of(message: &Arc<Message>) -> usize {
    Arc::as_ptr(message) as usize
}

impl HighlightRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or overwrite highlight info for a message
    ///
    /// Last write wins. Triggers an amortized prune once the table grows
    /// past an adaptive threshold, so dead entries never accumulate.
    pub fn insert(&self, message: &Arc<Message>, info: HighlightInfo) {
        let mut inner = self.inner.write();
        inner.entries.insert(
            key_of(message),
            Entry {
                target: Arc::downgrade(message),
                info,
            },
        );

        if inner.entries.len() >= inner.prune_at.max(PRUNE_FLOOR) {
            inner.entries.retain(|_, entry| entry.target.strong_count() > 0);
            inner.prune_at = inner.entries.len() * 2;
        }
    }

    /// Look up highlight info for a message
    pub fn get(&self, message: &Arc<Message>) -> Option<HighlightInfo> {
        self.inner
            .read()
            .entries
            .get(&key_of(message))
            .map(|entry| entry.info.clone())
    }

    /// Check whether a message is highlighted
    #[inline]
    pub fn is_highlighted(&self, message: &Arc<Message>) -> bool {
        self.inner.read().entries.contains_key(&key_of(message))
    }

    /// Remove a message's highlight, if any
    pub fn remove(&self, message: &Arc<Message>) -> bool {
        self.inner.write().entries.remove(&key_of(message)).is_some()
    }

    /// Drop every association
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.prune_at = 0;
    }

    /// Sweep entries whose message has been dropped
    ///
    /// Returns the number of entries removed. Called opportunistically by
    /// `insert` and periodically by the tap maintenance task.
    pub fn prune(&self) -> usize {
        let mut inner = self.inner.write();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| entry.target.strong_count() > 0);
        inner.prune_at = inner.entries.len() * 2;
        before - inner.entries.len()
    }

    /// Number of entries, including not-yet-pruned dead ones
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Whether the registry has no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "highlight_test.rs"]
mod tests;
