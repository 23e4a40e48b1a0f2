//! WebSocket router — the realtime relay core.
//!
//! DESIGN
//! ======
//! On upgrade, the connection is assigned the next monotonic id and attached
//! to the registry, then enters a `select!` loop:
//! - Inbound client messages → parse + dispatch by `type`
//! - Payloads queued by peer broadcasts → forward to the client
//!
//! Handler functions are pure business logic — they validate, mutate state,
//! and return an `Outcome`. The dispatch layer owns all outbound concerns:
//! reply to the sender and fan-out to peers. The whole
//! parse → mutate → fan-out sequence for one message runs under the relay
//! write lock, so mutations and their broadcasts form one total order.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → `registry.attach` (no identity yet)
//! 2. Client sends messages → dispatch → handler returns Outcome
//! 3. Dispatch applies Outcome (reply / relay / broadcast)
//! 4. Close or transport error → `registry.unregister` → roster broadcast

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::message::{CanvasOp, ClientMessage, Outbound, ServerMessage};
use crate::services::registry::OUTBOUND_QUEUE_CAPACITY;
use crate::state::{AppState, RelayState};

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The dispatch layer uses this to
/// decide who receives what — handlers never send payloads directly.
enum Outcome {
    /// Reply with the history snapshot; broadcast the roster to ALL
    /// connections including the sender.
    Joined { history: ServerMessage },
    /// Relay a canvas op to every connection EXCEPT the sender. No reply.
    Relay(CanvasOp),
    /// Reply to the sender only.
    Reply(ServerMessage),
    /// Reply to the sender, broadcast a different payload to ALL connections
    /// including the sender.
    ReplyAndBroadcast { reply: ServerMessage, broadcast: ServerMessage },
    /// Drop the message. Unknown types are not an error.
    Ignore,
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let client_id = state.allocate_connection_id();

    // Per-connection bounded queue for payloads broadcast by peers. A slow
    // consumer loses frames from this queue instead of stalling the relay.
    let (tx, mut rx) = mpsc::channel::<Outbound>(OUTBOUND_QUEUE_CAPACITY);
    state.relay.write().await.registry.attach(client_id, tx);

    info!(%client_id, "client connected");

    loop {
        tokio::select! {
            inbound = socket.recv() => {
                let Some(Ok(msg)) = inbound else { break };
                match msg {
                    Message::Text(text) => {
                        let replies = process_inbound(&state, client_id, &text).await;
                        for reply in replies {
                            let _ = send_payload(&mut socket, &reply).await;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(payload) = rx.recv() => {
                if send_payload(&mut socket, &payload).await.is_err() {
                    break;
                }
            }
        }
    }

    teardown(&state, client_id).await;
}

/// Remove the connection and tell everyone left. Runs for every exit path,
/// including transports that never joined.
async fn teardown(state: &AppState, client_id: u64) {
    let mut relay = state.relay.write().await;
    relay.registry.unregister(client_id);
    relay.registry.broadcast_roster();
    info!(%client_id, "client disconnected");
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Parse and process one inbound text message, returning direct replies for
/// the sender. Broadcasts go through the registry queues, which lets tests
/// drive the dispatch table end-to-end without a live socket.
async fn process_inbound(state: &AppState, client_id: u64, text: &str) -> Vec<Outbound> {
    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(%client_id, error = %e, "malformed inbound message, dropping");
            return Vec::new();
        }
    };

    let mut relay = state.relay.write().await;
    route(&mut relay, client_id, msg)
}

/// The single synchronous entry point for one inbound message. Caller holds
/// the relay write lock.
fn route(relay: &mut RelayState, client_id: u64, msg: ClientMessage) -> Vec<Outbound> {
    let outcome = match msg {
        ClientMessage::Join { platform, username } => {
            handle_join(relay, client_id, platform, username)
        }
        ClientMessage::Draw { x, y, color, size, platform } => {
            handle_draw(relay, client_id, x, y, color, size, platform)
        }
        ClientMessage::Clear { platform } => handle_clear(relay, client_id, platform),
        ClientMessage::Register { email, platform, timestamp } => {
            handle_register(relay, client_id, email, platform, timestamp)
        }
        ClientMessage::GetRegistrations => handle_get_registrations(relay),
        ClientMessage::Unknown => Outcome::Ignore,
    };

    apply_outcome(relay, client_id, outcome)
}

/// Apply an outcome — the dispatch layer owns all outbound logic.
fn apply_outcome(relay: &RelayState, client_id: u64, outcome: Outcome) -> Vec<Outbound> {
    match outcome {
        Outcome::Joined { history } => {
            relay.registry.broadcast_roster();
            vec![history.into()]
        }
        Outcome::Relay(op) => {
            relay.registry.broadcast(&op.into(), Some(client_id));
            Vec::new()
        }
        Outcome::Reply(reply) => vec![reply.into()],
        Outcome::ReplyAndBroadcast { reply, broadcast } => {
            relay.registry.broadcast(&broadcast.into(), None);
            vec![reply.into()]
        }
        Outcome::Ignore => Vec::new(),
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

fn handle_join(
    relay: &mut RelayState,
    client_id: u64,
    platform: String,
    username: Option<String>,
) -> Outcome {
    info!(%client_id, %platform, "client joined");
    relay.registry.register(client_id, platform, username);
    Outcome::Joined {
        history: ServerMessage::History { history: relay.history.snapshot() },
    }
}

fn handle_draw(
    relay: &mut RelayState,
    client_id: u64,
    x: f64,
    y: f64,
    color: String,
    size: f64,
    platform: String,
) -> Outcome {
    let op = CanvasOp::Draw { x, y, color, size, platform, client_id };
    relay.history.append(op.clone());
    Outcome::Relay(op)
}

fn handle_clear(relay: &mut RelayState, client_id: u64, platform: String) -> Outcome {
    relay.history.clear();
    info!(%client_id, "canvas cleared");
    Outcome::Relay(CanvasOp::Clear { platform, client_id })
}

fn handle_register(
    relay: &mut RelayState,
    client_id: u64,
    email: String,
    platform: String,
    timestamp: Option<String>,
) -> Outcome {
    match relay.ledger.try_register(email, platform, timestamp) {
        Ok(registration) => {
            info!(%client_id, email = %registration.email, platform = %registration.platform, "new registration");
            Outcome::ReplyAndBroadcast {
                reply: ServerMessage::RegistrationSuccess,
                broadcast: ServerMessage::NewRegistration { registration },
            }
        }
        Err(e) => Outcome::Reply(ServerMessage::RegistrationError { message: e.to_string() }),
    }
}

fn handle_get_registrations(relay: &RelayState) -> Outcome {
    Outcome::Reply(ServerMessage::RegistrationsList { registrations: relay.ledger.list() })
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_payload(socket: &mut WebSocket, payload: &Outbound) -> Result<(), ()> {
    let json = match serde_json::to_string(payload) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "failed to serialize outbound payload");
            return Err(());
        }
    };
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
