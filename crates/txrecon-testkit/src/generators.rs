//! Proptest generators for property-based testing.

use proptest::prelude::*;

use txrecon_core::{Direction, PeerId, TxId};

/// Generate a random PeerId.
pub fn peer_id() -> impl Strategy<Value = PeerId> {
    any::<u64>().prop_map(PeerId::new)
}

/// Generate a random TxId.
pub fn tx_id() -> impl Strategy<Value = TxId> {
    any::<[u8; 32]>().prop_map(TxId::from_bytes)
}

/// Generate a connection direction.
pub fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Inbound), Just(Direction::Outbound)]
}

/// Generate a handshake salt.
pub fn salt() -> impl Strategy<Value = u64> {
    any::<u64>()
}
