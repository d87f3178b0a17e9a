//! Per-peer reconciliation state.
//!
//! The representation is private to this crate; callers only see the
//! operation results exposed by the tracker facade.

use std::collections::HashSet;
use std::time::Duration;

use txrecon_core::{Direction, HashKey, Role, TxId};

/// A pending handshake: local salt generated and announced, registration not
/// yet committed.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Handshake {
    /// Our salt contribution, announced to the peer.
    pub local_salt: u64,
    /// Direction of the connection.
    pub direction: Direction,
}

/// Transactions accumulated for a peer, awaiting the next reconciliation
/// round.
///
/// Bounded: once the cap is reached further transactions are refused and the
/// caller falls back to flooding them.
#[derive(Debug, Default)]
pub(crate) struct PendingSet {
    txids: HashSet<TxId>,
}

impl PendingSet {
    /// Insert a transaction unless the set already holds `cap` entries.
    /// Returns whether it was inserted.
    pub fn insert(&mut self, txid: TxId, cap: usize) -> bool {
        if self.txids.len() >= cap && !self.txids.contains(&txid) {
            return false;
        }
        self.txids.insert(txid)
    }

    /// Remove a transaction. Returns whether it was present.
    pub fn remove(&mut self, txid: &TxId) -> bool {
        self.txids.remove(txid)
    }

    /// Number of pending transactions.
    pub fn len(&self) -> usize {
        self.txids.len()
    }
}

/// Full state for a registered peer.
#[derive(Debug)]
pub(crate) struct PeerState {
    /// Our reconciliation role on this connection.
    pub role: Role,
    /// Negotiated protocol version (non-zero).
    pub version: u32,
    /// Per-connection key mixed from both handshake salts; used for short-ID
    /// derivation.
    pub conn_key: HashKey,
    /// Transactions queued for the next round.
    pub pending: PendingSet,
    /// A round has been initiated and not yet concluded.
    pub in_flight: bool,
    /// When our last round with this peer started.
    pub last_round_start: Option<Duration>,
}

impl PeerState {
    pub fn new(role: Role, version: u32, conn_key: HashKey) -> Self {
        Self {
            role,
            version,
            conn_key,
            pending: PendingSet::default(),
            in_flight: false,
            last_round_start: None,
        }
    }
}

/// Lifecycle slot for a tracked peer id.
///
/// Ids absent from the registry are in the implicit "none" state.
#[derive(Debug)]
pub(crate) enum PeerSlot {
    /// Salt generated, waiting for the peer to accept the handshake.
    PreRegistered(Handshake),
    /// Fully registered for reconciliation.
    Registered(PeerState),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txid(n: u8) -> TxId {
        TxId::from_bytes([n; 32])
    }

    #[test]
    fn test_pending_set_dedupes() {
        let mut set = PendingSet::default();
        assert!(set.insert(txid(1), 10));
        assert!(!set.insert(txid(1), 10));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_pending_set_respects_cap() {
        let mut set = PendingSet::default();
        assert!(set.insert(txid(1), 2));
        assert!(set.insert(txid(2), 2));
        assert!(!set.insert(txid(3), 2));
        // Re-inserting an existing member is not refused by the cap.
        assert!(!set.insert(txid(1), 2));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_pending_set_remove() {
        let mut set = PendingSet::default();
        set.insert(txid(1), 10);
        assert!(set.remove(&txid(1)));
        assert!(!set.remove(&txid(1)));
        assert_eq!(set.len(), 0);
    }
}
