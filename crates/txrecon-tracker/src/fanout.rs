//! Low-fanout flooding selection.
//!
//! Most transactions reach reconciling peers through sketches. To keep relay
//! latency low, a small deterministic subset of peers per transaction still
//! gets an immediate announcement.

use txrecon_core::{HashKey, KeyedHasher, TxId};

/// Decide membership of one peer in the fanout window for a transaction.
///
/// Registered peers hold stable ranks `0..class_size` within their direction
/// class. The window start is derived from the transaction id alone, so a
/// transaction selects the same `targets`-sized window on every query, and
/// over many transactions each peer is chosen with probability
/// `targets / class_size`.
pub(crate) fn in_fanout_window<H: KeyedHasher + ?Sized>(
    hasher: &H,
    hash_key: &HashKey,
    txid: &TxId,
    rank: usize,
    class_size: usize,
    targets: usize,
) -> bool {
    debug_assert!(rank < class_size);
    if targets == 0 || class_size == 0 {
        return false;
    }
    if targets >= class_size {
        return true;
    }
    let start = (hasher.hash64(hash_key, txid.as_bytes()) % class_size as u64) as usize;
    (rank + class_size - start) % class_size < targets
}

/// Remaining fanout target for a class after discounting announcements that
/// already went out through non-reconciling peers.
pub(crate) fn remaining_targets(class_target: usize, nonreconciling_relays: usize) -> usize {
    class_target.saturating_sub(nonreconciling_relays)
}
