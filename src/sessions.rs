//! Live tunnel session registry
//!
//! Counts concurrently open tunnels per session identifier. Several browser
//! tabs sharing one identifier map to one entry with a growing count; the
//! entry disappears exactly when the last tunnel closes.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// One snapshot row: a session identifier and its live tunnel count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    /// Session identifier
    pub uuid: String,
    /// Number of currently open tunnels sharing it
    pub count: u64,
}

/// Concurrency-safe counter of live tunnel sessions
///
/// The tunnel collaborator calls [`add`](Self::add) on open and
/// [`remove`](Self::remove) on close; the monitoring surface reads
/// [`snapshot`](Self::snapshot). One lock guards the whole map, so
/// operations on the same identifier are linearized and a snapshot never
/// observes a partially-updated entry.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    conns: RwLock<HashMap<String, u64>>,
}

impl SessionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tunnel open: create the entry at 1 or increment it
    pub fn add(&self, id: &str) {
        let mut conns = self.conns.write();
        *conns.entry(id.to_string()).or_insert(0) += 1;
    }

    /// Record a tunnel close: decrement, deleting the entry at zero
    ///
    /// Removing an absent identifier is a no-op, so the count can never
    /// underflow.
    pub fn remove(&self, id: &str) {
        let mut conns = self.conns.write();
        let Some(count) = conns.get_mut(id) else {
            return;
        };

        if *count <= 1 {
            conns.remove(id);
        } else {
            *count -= 1;
        }
    }

    /// Current live count for an identifier, 0 when absent
    #[must_use]
    pub fn get(&self, id: &str) -> u64 {
        self.conns.read().get(id).copied().unwrap_or(0)
    }

    /// Snapshot of every entry, sorted by identifier
    #[must_use]
    pub fn snapshot(&self) -> Vec<SessionEntry> {
        let conns = self.conns.read();
        let mut entries: Vec<SessionEntry> = conns
            .iter()
            .map(|(uuid, count)| SessionEntry {
                uuid: uuid.clone(),
                count: *count,
            })
            .collect();
        entries.sort_by(|a, b| a.uuid.cmp(&b.uuid));
        entries
    }
}
