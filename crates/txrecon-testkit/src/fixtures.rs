//! Test fixtures and helpers.
//!
//! Common setup code for tracker tests.

use txrecon_core::{Direction, HashKey, PeerId};
use txrecon_tracker::{ReconciliationTracker, TrackerConfig};

use crate::hashers::StubHasher;

/// A tracker over a deterministic stub hasher, plus a fixed node-wide
/// fanout key.
pub struct TrackerFixture {
    pub tracker: ReconciliationTracker<StubHasher>,
    pub fanout_key: HashKey,
}

impl TrackerFixture {
    /// Create a fixture with seed 0 and default configuration.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Create a fixture with a specific hasher seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_config(seed, TrackerConfig::default())
    }

    /// Create a fixture with a specific hasher seed and configuration.
    pub fn with_config(seed: u64, config: TrackerConfig) -> Self {
        Self {
            tracker: ReconciliationTracker::new(StubHasher::new(seed), config),
            fanout_key: HashKey::new(0x0706050403020100, 0x0f0e0d0c0b0a0908),
        }
    }

    /// Pre-register and register a peer in one step, using its id as the
    /// remote salt.
    pub fn register(&self, peer_id: PeerId, direction: Direction) {
        self.tracker.pre_register(peer_id, direction).unwrap();
        self.tracker
            .register_peer(peer_id, direction, 1, peer_id.as_u64())
            .unwrap();
    }

    /// Register peers with ids `0..count`, all of the given direction.
    pub fn register_many(&self, count: u64, direction: Direction) -> Vec<PeerId> {
        (0..count)
            .map(|n| {
                let peer = PeerId::new(n);
                self.register(peer, direction);
                peer
            })
            .collect()
    }
}

impl Default for TrackerFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Install a log subscriber for a test run. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
