//! # txrecon Tracker
//!
//! Peer-side bookkeeping for set-reconciliation transaction relay.
//!
//! ## Overview
//!
//! Announcing every transaction to every peer costs bandwidth quadratic in
//! connectivity. Reconciliation replaces most announcements: each side
//! accumulates the transactions it would relay to a peer, and at intervals
//! the two exchange compact sketches of those sets, recover the symmetric
//! difference, and request only what they are missing.
//!
//! This crate owns the bookkeeping around that exchange, not the sketch math:
//!
//! - **Peer registry**: the handshake lifecycle (pre-registered →
//!   registered → forgotten), negotiated parameters, and the per-peer
//!   pending set
//! - **Fanout selector**: which few peers still get a transaction flooded
//!   immediately, chosen deterministically per transaction
//! - **Scheduler**: a round-robin queue answering "which peer do we
//!   reconcile with next, and is it time yet"
//! - **Request builder**: the `(set_size, q)` pair that opens a round
//!
//! ## A round, end to end
//!
//! ```text
//! handshake layer        tracker                      message layer
//!       |-- pre_register -->|                               |
//!       |<----- salt -------|                               |
//!       |-- register_peer ->|                               |
//!       |                   |<-- add_to_set (per tx) -------|
//!       |                   |<-- is_peer_due (poll) --------|
//!       |                   |<-- begin_round ---------------|
//!       |                   |--- {set_size, q} ------------>|
//!       |                   |<-- conclude_round (response) -|
//! ```
//!
//! Sketch encoding/decoding, wire serialization, and connection management
//! live in the embedding node; timestamps are supplied by the caller, so all
//! scheduling logic is deterministic under synthetic time.

pub mod error;
pub mod tracker;

mod fanout;
mod peer;
mod scheduler;

pub use error::RegisterError;
pub use tracker::{
    ReconciliationRequest, ReconciliationTracker, TrackerConfig, Q_PRECISION, RECON_VERSION,
};
