//! # txrecon Core
//!
//! Pure primitives for transaction reconciliation: identifiers, connection
//! roles, and keyed hashing.
//!
//! This crate contains no I/O, no locking, no networking. It is pure
//! computation over small value types.
//!
//! ## Key Types
//!
//! - [`PeerId`] - Opaque connection identifier
//! - [`TxId`] - Full-size transaction identifier
//! - [`Direction`] / [`Role`] - Connection direction and the reconciliation
//!   role it implies
//! - [`HashKey`] / [`KeyedHasher`] - The keyed hash oracle used for short-ID
//!   derivation and fanout selection
//!
//! ## Keyed Hashing
//!
//! All pseudorandom decisions (which peers to flood a transaction to, what
//! short ID a transaction gets on a connection) are derived from a keyed
//! hash. The hash is injected as a capability so tests can pin it down; the
//! production implementation is [`Blake3KeyedHasher`].

pub mod hash;
pub mod types;

pub use hash::{combine_salts, short_tx_id, Blake3KeyedHasher, HashKey, KeyedHasher};
pub use types::{Direction, PeerId, Role, TxId};
