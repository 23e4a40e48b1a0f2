//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into axum handlers via the `State` extractor. The
//! registry, history log, and ledger are owned here and handed to the router
//! at construction time — no ambient globals. All three live behind one
//! coarse `RwLock`: the router takes the write lock once per inbound message
//! and performs the full validate → mutate → fan-out sequence under it, so
//! every mutation and its broadcast form a single global total order.
//! Throughput is not a concern at this fan-in; correctness is.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use crate::services::content::ContentClient;
use crate::services::history::HistoryLog;
use crate::services::ledger::Ledger;
use crate::services::registry::Registry;

// =============================================================================
// RELAY STATE
// =============================================================================

/// The relay's shared mutable state. Mutated only by the websocket router.
#[derive(Default)]
pub struct RelayState {
    pub registry: Registry,
    pub history: HistoryLog,
    pub ledger: Ledger,
}

impl RelayState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into axum handlers via the State
/// extractor. Clone is required by axum — inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<RwLock<RelayState>>,
    /// Content client. `None` when the CMS env vars are not configured.
    pub content: Option<Arc<ContentClient>>,
    next_connection_id: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(content: Option<Arc<ContentClient>>) -> Self {
        Self {
            relay: Arc::new(RwLock::new(RelayState::new())),
            content,
            next_connection_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Allocate the next connection id. Ids start at 1, increase
    /// monotonically, and are never reused for the process lifetime.
    #[must_use]
    pub fn allocate_connection_id(&self) -> u64 {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

// =============================================================================
// TESTS
// =============================================================================
