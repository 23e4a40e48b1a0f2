//! Realtime relay for the multi-platform canvas demo.
//!
//! One process accepts websocket connections from every platform front-end,
//! keeps the shared canvas history, user roster, and registration ledger in
//! memory, and fans state changes out to all connected clients. The binary
//! entry point is in `main.rs`; this crate root exposes the internal modules
//! for integration testing.

pub mod message;
pub mod routes;
pub mod services;
pub mod state;
