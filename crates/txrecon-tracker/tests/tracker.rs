//! End-to-end scenarios for the reconciliation tracker: fanout selection,
//! round scheduling, and request construction across the peer lifecycle.

use std::time::Duration;

use txrecon_core::{Blake3KeyedHasher, Direction, HashKey, PeerId, TxId};
use txrecon_tracker::{ReconciliationTracker, TrackerConfig};

const SEC: Duration = Duration::from_secs(1);

/// Node-wide fanout key, as the relay layer would derive once at startup.
const FANOUT_KEY: HashKey = HashKey::new(0x0706050403020100, 0x0f0e0d0c0b0a0908);

fn tracker() -> ReconciliationTracker<Blake3KeyedHasher> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    ReconciliationTracker::new(Blake3KeyedHasher, TrackerConfig::default())
}

fn peer(n: u64) -> PeerId {
    PeerId::new(n)
}

fn tx(n: u64) -> TxId {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&n.to_le_bytes());
    bytes[8..16].copy_from_slice(&n.wrapping_mul(0x9e3779b97f4a7c15).to_le_bytes());
    TxId::from_bytes(bytes)
}

fn register(
    tracker: &ReconciliationTracker<Blake3KeyedHasher>,
    peer_id: PeerId,
    direction: Direction,
) {
    tracker.pre_register(peer_id, direction).unwrap();
    tracker
        .register_peer(peer_id, direction, 1, peer_id.as_u64())
        .unwrap();
}

#[test]
fn fanout_falls_back_to_flooding_for_unregistered_peers() {
    let tracker = tracker();

    for i in 0..100 {
        assert!(tracker.should_fanout_to(&tx(i), &FANOUT_KEY, peer(0), 0, 0));
    }

    // Pre-registration alone does not opt a peer into reconciliation.
    tracker.pre_register(peer(0), Direction::Outbound).unwrap();
    for i in 0..100 {
        assert!(tracker.should_fanout_to(&tx(i), &FANOUT_KEY, peer(0), 0, 0));
    }
}

#[test]
fn fanout_saturates_single_outbound_peer() {
    let tracker = tracker();
    register(&tracker, peer(0), Direction::Outbound);

    // The only outbound reconciling peer absorbs the whole outbound target.
    for i in 0..100 {
        assert!(tracker.should_fanout_to(&tx(i), &FANOUT_KEY, peer(0), 0, 0));
    }

    // One non-reconciling outbound relay already served the target.
    for i in 0..100 {
        assert!(!tracker.should_fanout_to(&tx(i), &FANOUT_KEY, peer(0), 0, 1));
    }

    // Forgetting the peer restores baseline flooding.
    tracker.forget_peer(peer(0));
    for i in 0..100 {
        assert!(tracker.should_fanout_to(&tx(i), &FANOUT_KEY, peer(0), 0, 0));
    }
}

#[test]
fn fanout_selects_fraction_of_inbound_class() {
    let tracker = tracker();
    for n in 1..31 {
        register(&tracker, peer(n), Direction::Inbound);
    }

    // 10% of 30 inbound peers: every transaction picks exactly 3 of them.
    for i in 0..100 {
        let txid = tx(i);
        let fanouted = (1..31)
            .filter(|&n| tracker.should_fanout_to(&txid, &FANOUT_KEY, peer(n), 0, 0))
            .count();
        assert_eq!(fanouted, 3);
    }

    // Enough non-reconciling inbound relays: nobody is selected.
    for i in 0..100 {
        let txid = tx(i);
        let fanouted = (1..31)
            .filter(|&n| tracker.should_fanout_to(&txid, &FANOUT_KEY, peer(n), 4, 0))
            .count();
        assert_eq!(fanouted, 0);
    }
}

#[test]
fn fanout_is_deterministic_per_transaction() {
    let tracker = tracker();
    for n in 0..10 {
        register(&tracker, peer(n), Direction::Inbound);
    }

    let txid = tx(42);
    let first: Vec<bool> = (0..10)
        .map(|n| tracker.should_fanout_to(&txid, &FANOUT_KEY, peer(n), 0, 0))
        .collect();
    // Query order and repetition do not change the selected window.
    for n in (0..10).rev() {
        assert_eq!(
            tracker.should_fanout_to(&txid, &FANOUT_KEY, peer(n), 0, 0),
            first[n as usize]
        );
    }
}

#[test]
fn scheduler_ignores_responders_and_unknown_peers() {
    let tracker = tracker();
    assert_eq!(tracker.is_peer_due(peer(0), SEC), None);

    tracker.pre_register(peer(0), Direction::Outbound).unwrap();
    assert_eq!(tracker.is_peer_due(peer(0), SEC), None);

    // Inbound peers drive their own timing; we never initiate with them.
    register(&tracker, peer(1), Direction::Inbound);
    assert_eq!(tracker.is_peer_due(peer(1), SEC), None);
    assert_eq!(tracker.begin_round(peer(1), SEC), None);
}

#[test]
fn scheduler_alternates_between_initiators() {
    let tracker = tracker();
    register(&tracker, peer(1), Direction::Outbound);
    register(&tracker, peer(2), Direction::Outbound);

    // First registrant heads the queue and is due right away.
    assert_eq!(tracker.is_peer_due(peer(1), SEC), Some(true));
    assert_eq!(tracker.is_peer_due(peer(2), SEC), Some(false));

    // Due-ness is a pure query: it holds until a round actually starts.
    assert_eq!(tracker.is_peer_due(peer(1), 5 * SEC), Some(true));
    assert_eq!(tracker.is_peer_due(peer(1), SEC), Some(true));

    assert!(tracker.begin_round(peer(2), SEC).is_none());
    assert!(tracker.begin_round(peer(1), SEC).is_some());
    tracker.conclude_round(peer(1));

    // Head moved to peer 2; the global pacing gate opens two seconds after
    // the round start.
    assert_eq!(tracker.is_peer_due(peer(1), 3 * SEC), Some(false));
    assert_eq!(tracker.is_peer_due(peer(2), 2 * SEC), Some(false));
    assert_eq!(tracker.is_peer_due(peer(2), 3 * SEC), Some(true));
    assert!(tracker.begin_round(peer(2), 3 * SEC).is_some());
    tracker.conclude_round(peer(2));

    // Peer 1 is head again but its own revisit gate (8s) runs to t=9.
    assert_eq!(tracker.is_peer_due(peer(1), 5 * SEC), Some(false));
    assert_eq!(tracker.is_peer_due(peer(1), 8 * SEC), Some(false));
    assert_eq!(tracker.is_peer_due(peer(1), 9 * SEC), Some(true));
}

#[test]
fn begun_round_blocks_retrigger_until_next_cycle() {
    let tracker = tracker();
    register(&tracker, peer(1), Direction::Outbound);
    register(&tracker, peer(2), Direction::Outbound);

    assert!(tracker.begin_round(peer(1), 10 * SEC).is_some());

    // In flight: not due, and a second round cannot start.
    assert_eq!(tracker.is_peer_due(peer(1), 60 * SEC), Some(false));
    assert!(tracker.begin_round(peer(1), 60 * SEC).is_none());

    tracker.conclude_round(peer(1));

    // Concluded, but peer 2 now holds the head.
    assert_eq!(tracker.is_peer_due(peer(1), 60 * SEC), Some(false));
    assert_eq!(tracker.is_peer_due(peer(2), 60 * SEC), Some(true));
    assert!(tracker.begin_round(peer(2), 60 * SEC).is_some());

    // Cycled back and past the revisit gate: due again.
    assert_eq!(tracker.is_peer_due(peer(1), 70 * SEC), Some(true));
}

#[test]
fn in_flight_head_does_not_stall_queue() {
    let tracker = tracker();
    register(&tracker, peer(1), Direction::Outbound);
    register(&tracker, peer(2), Direction::Outbound);

    assert!(tracker.begin_round(peer(1), 10 * SEC).is_some());
    // Round 1 never concludes; peer 2 becomes the head once the pacing gate
    // reopens.
    assert_eq!(tracker.is_peer_due(peer(2), 11 * SEC), Some(false));
    assert_eq!(tracker.is_peer_due(peer(2), 12 * SEC), Some(true));
    assert!(tracker.begin_round(peer(2), 12 * SEC).is_some());
    tracker.conclude_round(peer(2));

    // Peer 1 cycled back to the queue front, still in flight. It is skipped,
    // so peer 2 is the effective head as soon as its own gate elapses.
    assert_eq!(tracker.is_peer_due(peer(1), 20 * SEC), Some(false));
    assert_eq!(tracker.is_peer_due(peer(2), 20 * SEC), Some(true));
    assert!(tracker.begin_round(peer(2), 20 * SEC).is_some());
}

#[test]
fn forgotten_head_exposes_next_peer() {
    let tracker = tracker();
    register(&tracker, peer(1), Direction::Outbound);
    register(&tracker, peer(2), Direction::Outbound);

    assert_eq!(tracker.is_peer_due(peer(1), SEC), Some(true));
    assert_eq!(tracker.is_peer_due(peer(2), SEC), Some(false));

    // No action on the forgotten head is needed to unblock the queue.
    tracker.forget_peer(peer(1));
    assert_eq!(tracker.is_peer_due(peer(2), SEC), Some(true));
    assert_eq!(tracker.is_peer_due(peer(1), SEC), None);
}

#[test]
fn begin_round_reports_set_size_and_q() {
    let tracker = tracker();

    assert!(tracker.begin_round(peer(0), SEC).is_none());
    tracker.pre_register(peer(0), Direction::Outbound).unwrap();
    assert!(tracker.begin_round(peer(0), SEC).is_none());
    tracker
        .register_peer(peer(0), Direction::Outbound, 1, 1)
        .unwrap();

    let request = tracker.begin_round(peer(0), SEC).unwrap();
    assert_eq!(request.set_size, 0);
    assert_eq!(request.q, 8192); // round(0.25 * 32767)

    // Start fresh with a populated set.
    tracker.forget_peer(peer(0));
    tracker.pre_register(peer(0), Direction::Outbound).unwrap();
    tracker
        .register_peer(peer(0), Direction::Outbound, 1, 1)
        .unwrap();
    for i in 0..3 {
        assert!(tracker.add_to_set(peer(0), tx(i)));
    }

    let request = tracker.begin_round(peer(0), 10 * SEC).unwrap();
    assert_eq!(request.set_size, 3);
    assert_eq!(request.q, 8192);

    // The pending set is not drained by starting a round.
    assert_eq!(tracker.peer_set_size(peer(0)), Some(3));
}

#[test]
fn conclude_round_reports_whether_round_was_open() {
    let tracker = tracker();
    assert!(!tracker.conclude_round(peer(0)));

    register(&tracker, peer(0), Direction::Outbound);
    assert!(!tracker.conclude_round(peer(0)));

    assert!(tracker.begin_round(peer(0), SEC).is_some());
    assert!(tracker.conclude_round(peer(0)));
    assert!(!tracker.conclude_round(peer(0)));
}
