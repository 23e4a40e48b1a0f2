//! Wire protocol for the relay.
//!
//! DESIGN
//! ======
//! Every payload is a JSON object with a mandatory `type` discriminator.
//! Inbound and outbound directions get separate enums so the dispatch table
//! is a single `match` over `ClientMessage` and handlers can only produce
//! well-formed replies. Canvas operations carry their own tag and are stored
//! in the history log exactly as they are relayed, so a replay is the same
//! bytes a live peer saw.

use serde::{Deserialize, Serialize};

// =============================================================================
// INBOUND
// =============================================================================

/// A client-to-relay message.
///
/// A known `type` with missing or mistyped fields fails to parse and is
/// dropped by the router; an unknown `type` deserializes to `Unknown` and is
/// ignored without an error reply.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join {
        platform: String,
        #[serde(default)]
        username: Option<String>,
    },
    Draw {
        x: f64,
        y: f64,
        color: String,
        size: f64,
        platform: String,
    },
    Clear {
        platform: String,
    },
    Register {
        email: String,
        platform: String,
        #[serde(default)]
        timestamp: Option<String>,
    },
    GetRegistrations,
    #[serde(other)]
    Unknown,
}

// =============================================================================
// CANVAS OPERATIONS
// =============================================================================

/// A canvas operation as relayed to peers.
///
/// `Draw` entries are retained in the history log; `Clear` is relayed only —
/// its effect on the log is structural (a wipe), never a stored entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanvasOp {
    Draw {
        x: f64,
        y: f64,
        color: String,
        size: f64,
        platform: String,
        #[serde(rename = "clientId")]
        client_id: u64,
    },
    Clear {
        platform: String,
        #[serde(rename = "clientId")]
        client_id: u64,
    },
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// One joined connection as listed in a `users` broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: u64,
    pub platform: String,
    pub username: String,
}

/// One accepted sign-up. Stored in the ledger and sent verbatim on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub email: String,
    pub platform: String,
    pub timestamp: String,
}

/// Relay-originated messages (everything outbound that is not a relayed
/// canvas op).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    History { history: Vec<CanvasOp> },
    Users { users: Vec<RosterEntry>, count: usize },
    RegistrationSuccess,
    RegistrationError { message: String },
    NewRegistration { registration: Registration },
    RegistrationsList { registrations: Vec<Registration> },
}

/// Any relay-to-client payload. Both arms tag themselves, so the wire shares
/// one `type` namespace and this serializes untagged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outbound {
    Canvas(CanvasOp),
    Server(ServerMessage),
}

impl From<CanvasOp> for Outbound {
    fn from(op: CanvasOp) -> Self {
        Outbound::Canvas(op)
    }
}

impl From<ServerMessage> for Outbound {
    fn from(msg: ServerMessage) -> Self {
        Outbound::Server(msg)
    }
}

// =============================================================================
// TESTS
// =============================================================================
