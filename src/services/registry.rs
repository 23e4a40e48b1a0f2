//! Connection registry — live transports and their declared identities.
//!
//! DESIGN
//! ======
//! Every transport gets an entry at upgrade time holding the sender half of
//! its bounded outbound queue. A `join` promotes the entry with platform and
//! username; the roster lists only promoted entries, while broadcasts reach
//! every live transport, joined or not. The caller holds the relay lock
//! across mutation and fan-out, so insert-or-overwrite, removal, and the
//! roster broadcasts they trigger are serialized.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use crate::message::{Outbound, RosterEntry, ServerMessage};

/// Outbound queue capacity per connection. A connection whose queue is full
/// misses frames; it is never allowed to stall delivery to others.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

// =============================================================================
// TYPES
// =============================================================================

/// Declared identity of a joined connection.
#[derive(Debug, Clone)]
pub struct Identity {
    pub platform: String,
    pub username: String,
}

struct Connection {
    tx: mpsc::Sender<Outbound>,
    identity: Option<Identity>,
}

#[derive(Default)]
pub struct Registry {
    connections: HashMap<u64, Connection>,
}

// =============================================================================
// REGISTRY
// =============================================================================

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly upgraded transport. No identity yet.
    pub fn attach(&mut self, id: u64, tx: mpsc::Sender<Outbound>) {
        self.connections.insert(id, Connection { tx, identity: None });
    }

    /// Record (or overwrite) the identity for a connection. A missing
    /// username falls back to `User<id>`. Unknown ids are a no-op: the
    /// transport already went away.
    pub fn register(&mut self, id: u64, platform: String, username: Option<String>) {
        if let Some(conn) = self.connections.get_mut(&id) {
            let username = username.unwrap_or_else(|| format!("User{id}"));
            conn.identity = Some(Identity { platform, username });
        }
    }

    /// Drop a connection. Unknown ids are a no-op.
    pub fn unregister(&mut self, id: u64) {
        self.connections.remove(&id);
    }

    /// Snapshot of joined connections. Order is not significant, but every
    /// joined connection appears exactly once.
    #[must_use]
    pub fn roster(&self) -> Vec<RosterEntry> {
        self.connections
            .iter()
            .filter_map(|(id, conn)| {
                conn.identity.as_ref().map(|identity| RosterEntry {
                    id: *id,
                    platform: identity.platform.clone(),
                    username: identity.username.clone(),
                })
            })
            .collect()
    }

    /// Queue a payload on every live transport, optionally excluding one.
    /// Best-effort: a connection with a full queue misses this payload, and
    /// a closed receiver means the connection is already tearing down.
    pub fn broadcast(&self, payload: &Outbound, exclude: Option<u64>) {
        for (id, conn) in &self.connections {
            if exclude == Some(*id) {
                continue;
            }
            match conn.tx.try_send(payload.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(client_id = *id, "outbound queue full, dropping frame");
                }
                Err(TrySendError::Closed(_)) => {}
            }
        }
    }

    /// Broadcast the current roster to every live transport. Runs after
    /// every register/unregister so peer lists and admin views stay in sync.
    pub fn broadcast_roster(&self) {
        let users = self.roster();
        let count = users.len();
        self.broadcast(&ServerMessage::Users { users, count }.into(), None);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
