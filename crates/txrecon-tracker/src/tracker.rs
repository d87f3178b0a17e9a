//! The reconciliation tracker facade.
//!
//! One tracker instance owns all per-peer reconciliation bookkeeping for a
//! node. Every operation takes `&self` and serializes behind a single mutex:
//! queue consistency and exactly-k fanout selection are cross-peer
//! invariants, so per-peer locking would not be enough.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use txrecon_core::{
    combine_salts, Direction, HashKey, KeyedHasher, PeerId, Role, TxId,
};

use crate::error::RegisterError;
use crate::fanout::{in_fanout_window, remaining_targets};
use crate::peer::{Handshake, PeerSlot, PeerState};
use crate::scheduler::InitiatorQueue;

/// Reconciliation protocol version we support.
pub const RECON_VERSION: u32 = 1;

/// Fixed-point denominator for the q-coefficient (15-bit fraction).
pub const Q_PRECISION: u16 = 32767;

/// Configuration for a [`ReconciliationTracker`].
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Protocol version we negotiate down to.
    pub version: u32,
    /// Minimum time between two rounds with the same peer.
    pub peer_revisit_interval: Duration,
    /// Minimum time between round starts across all peers, independent of
    /// queue depth.
    pub round_start_interval: Duration,
    /// Cap on the per-peer pending set. Transactions refused here fall back
    /// to flooding.
    pub max_set_size: usize,
    /// How many outbound reconciling peers to flood each transaction to.
    pub outbound_fanout_targets: usize,
    /// Fraction of inbound reconciling peers to flood each transaction to.
    pub inbound_fanout_fraction: f64,
    /// Sketch over-provisioning coefficient sent with every request.
    pub q: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            version: RECON_VERSION,
            peer_revisit_interval: Duration::from_secs(8),
            round_start_interval: Duration::from_secs(2),
            max_set_size: 3000,
            outbound_fanout_targets: 1,
            inbound_fanout_fraction: 0.1,
            q: 0.25,
        }
    }
}

/// Parameters of an outgoing reconciliation request.
///
/// Together with the peer's own set size these let the responder plan sketch
/// capacity; the tracker only produces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationRequest {
    /// Size of our pending set for the peer.
    pub set_size: u16,
    /// q-coefficient as a 15-bit fixed-point fraction.
    pub q: u16,
}

struct TrackerInner {
    /// All tracked peers, pre-registered and registered alike.
    peers: HashMap<PeerId, PeerSlot>,
    /// FIFO of registered initiator-role peers.
    queue: InitiatorQueue,
    /// Stable fanout ranks: registration order per direction class.
    inbound_order: Vec<PeerId>,
    outbound_order: Vec<PeerId>,
}

impl TrackerInner {
    fn registered(&self, peer_id: PeerId) -> Option<&PeerState> {
        match self.peers.get(&peer_id) {
            Some(PeerSlot::Registered(state)) => Some(state),
            _ => None,
        }
    }

    fn registered_mut(&mut self, peer_id: PeerId) -> Option<&mut PeerState> {
        match self.peers.get_mut(&peer_id) {
            Some(PeerSlot::Registered(state)) => Some(state),
            _ => None,
        }
    }

    fn due_at(&self, peer_id: PeerId, state: &PeerState, now: Duration, config: &TrackerConfig) -> bool {
        if state.in_flight {
            return false;
        }
        let head = self
            .queue
            .effective_head(|id| self.registered(id).is_some_and(|s| s.in_flight));
        if head != Some(peer_id) {
            return false;
        }
        let revisit_open = state
            .last_round_start
            .map_or(true, |t| now >= t + config.peer_revisit_interval);
        revisit_open && self.queue.pacing_open(now, config.round_start_interval)
    }
}

/// Tracks everything needed to reconcile transactions with peers.
///
/// The protocol, from this tracker's side:
/// 1. The handshake layer pre-registers a peer, obtaining the salt to
///    announce, then registers it once the peer accepts.
/// 2. Transactions destined for a registered peer accumulate in its pending
///    set instead of being announced immediately; a deterministic few peers
///    per transaction are still flooded (see [`should_fanout_to`]).
/// 3. For peers we initiate with, the scheduler is polled until a peer is
///    due, then [`begin_round`] produces the request parameters and flags
///    the round in flight.
/// 4. Round completion (a response or a timeout, decided elsewhere) is
///    reported back via [`conclude_round`].
///
/// [`should_fanout_to`]: ReconciliationTracker::should_fanout_to
/// [`begin_round`]: ReconciliationTracker::begin_round
/// [`conclude_round`]: ReconciliationTracker::conclude_round
pub struct ReconciliationTracker<H: KeyedHasher> {
    hasher: H,
    config: TrackerConfig,
    inner: Mutex<TrackerInner>,
}

impl<H: KeyedHasher> ReconciliationTracker<H> {
    /// Create a tracker with the given hash oracle and configuration.
    pub fn new(hasher: H, config: TrackerConfig) -> Self {
        Self {
            hasher,
            config,
            inner: Mutex::new(TrackerInner {
                peers: HashMap::new(),
                queue: InitiatorQueue::default(),
                inbound_order: Vec::new(),
                outbound_order: Vec::new(),
            }),
        }
    }

    /// The tracker's configuration.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, TrackerInner> {
        self.inner.lock().unwrap()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Peer lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Generate the local salt for a peer and stage it for registration.
    ///
    /// Returns the salt to announce in the handshake, or `None` if the peer
    /// is already registered (its salt is committed; re-staging would break
    /// the connection key both sides derived). Repeated pre-registration of
    /// a not-yet-registered id refreshes the pending handshake slot.
    pub fn pre_register(&self, peer_id: PeerId, direction: Direction) -> Option<u64> {
        let local_salt: u64 = rand::thread_rng().gen();

        let mut inner = self.lock();
        if let Some(PeerSlot::Registered(_)) = inner.peers.get(&peer_id) {
            tracing::warn!("ignoring pre-registration of registered peer={}", peer_id);
            return None;
        }
        inner.peers.insert(
            peer_id,
            PeerSlot::PreRegistered(Handshake {
                local_salt,
                direction,
            }),
        );
        tracing::debug!("pre-registered peer={} ({:?})", peer_id, direction);
        Some(local_salt)
    }

    /// Commit a pre-registered peer once it accepted the handshake.
    ///
    /// Derives our role from the connection direction, mixes both salts into
    /// the connection key, and queues initiator-role peers for scheduling.
    /// Fails without mutating state if the peer offered version zero, is
    /// already registered, or was never pre-registered.
    pub fn register_peer(
        &self,
        peer_id: PeerId,
        direction: Direction,
        peer_version: u32,
        remote_salt: u64,
    ) -> Result<(), RegisterError> {
        let mut inner = self.lock();

        let (local_salt, staged_direction) = match inner.peers.get(&peer_id) {
            None => return Err(RegisterError::NotFound),
            Some(PeerSlot::Registered(_)) => return Err(RegisterError::AlreadyRegistered),
            Some(PeerSlot::PreRegistered(handshake)) => {
                (handshake.local_salt, handshake.direction)
            }
        };
        debug_assert_eq!(staged_direction, direction);

        // Peers advertising a newer version reconcile at ours; offering less
        // than v1 is a protocol violation.
        let version = peer_version.min(self.config.version);
        if version < 1 {
            return Err(RegisterError::ProtocolViolation);
        }

        let role = direction.role();
        let conn_key = combine_salts(&self.hasher, local_salt, remote_salt);
        inner
            .peers
            .insert(peer_id, PeerSlot::Registered(PeerState::new(role, version, conn_key)));
        match direction {
            Direction::Inbound => inner.inbound_order.push(peer_id),
            Direction::Outbound => inner.outbound_order.push(peer_id),
        }
        if role.we_initiate() {
            inner.queue.push_back(peer_id);
        }
        tracing::debug!(
            "registered peer={} role={:?} version={}",
            peer_id,
            role,
            version
        );
        Ok(())
    }

    /// Drop all reconciliation state for a peer.
    ///
    /// Idempotent and safe on ids that were never tracked, so connection
    /// teardown can call it unconditionally. Forgetting the queue head
    /// immediately exposes the next peer to the due-check.
    pub fn forget_peer(&self, peer_id: PeerId) {
        let mut inner = self.lock();
        if inner.peers.remove(&peer_id).is_some() {
            inner.queue.remove(peer_id);
            inner.inbound_order.retain(|id| *id != peer_id);
            inner.outbound_order.retain(|id| *id != peer_id);
            tracing::debug!("stopped tracking reconciliation state for peer={}", peer_id);
        }
    }

    /// Whether the peer is fully registered (pre-registration alone is not
    /// enough).
    pub fn is_peer_registered(&self, peer_id: PeerId) -> bool {
        self.lock().registered(peer_id).is_some()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Pending set
    // ─────────────────────────────────────────────────────────────────────

    /// Queue a transaction for the next round with a registered peer.
    ///
    /// Returns whether it was added: `false` for unregistered peers,
    /// duplicates, and full sets, in which case the caller should announce
    /// the transaction directly.
    pub fn add_to_set(&self, peer_id: PeerId, txid: TxId) -> bool {
        let cap = self.config.max_set_size;
        let mut inner = self.lock();
        match inner.registered_mut(peer_id) {
            Some(state) => state.pending.insert(txid, cap),
            None => false,
        }
    }

    /// Remove a transaction from a peer's pending set, e.g. because the peer
    /// just announced it to us. Returns whether it was present.
    pub fn remove_from_set(&self, peer_id: PeerId, txid: &TxId) -> bool {
        let mut inner = self.lock();
        match inner.registered_mut(peer_id) {
            Some(state) => state.pending.remove(txid),
            None => false,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Fanout
    // ─────────────────────────────────────────────────────────────────────

    /// Whether to flood a transaction to this peer instead of (only)
    /// reconciling it.
    ///
    /// Unregistered peers always flood: reconciliation is not in use for
    /// them and baseline relay behavior applies. For registered peers the
    /// transaction deterministically selects a small window of each
    /// direction class; announcements already made through non-reconciling
    /// peers of the class shrink the window accordingly.
    ///
    /// `hash_key` is node-wide randomness owned by the caller; passing the
    /// same key for every peer is what makes the per-class selection add up
    /// to exactly the target count.
    pub fn should_fanout_to(
        &self,
        txid: &TxId,
        hash_key: &HashKey,
        peer_id: PeerId,
        inbound_nonrecon_relays: usize,
        outbound_nonrecon_relays: usize,
    ) -> bool {
        let inner = self.lock();
        let Some(state) = inner.registered(peer_id) else {
            return true;
        };

        let (order, class_target, already_relayed) = match state.role {
            Role::Initiator => (
                &inner.outbound_order,
                self.config.outbound_fanout_targets,
                outbound_nonrecon_relays,
            ),
            Role::Responder => {
                let class = &inner.inbound_order;
                let target =
                    (self.config.inbound_fanout_fraction * class.len() as f64).round() as usize;
                (class, target, inbound_nonrecon_relays)
            }
        };

        // Registered peers always hold a rank in their class.
        let rank = match order.iter().position(|id| *id == peer_id) {
            Some(rank) => rank,
            None => return false,
        };

        let targets = remaining_targets(class_target, already_relayed);
        in_fanout_window(&self.hasher, hash_key, txid, rank, order.len(), targets)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Scheduling
    // ─────────────────────────────────────────────────────────────────────

    /// Whether it is time to initiate a round with this peer.
    ///
    /// `None` if the peer is not a registered initiator-role peer (the
    /// question does not apply); `Some(false)` while the peer is not at the
    /// effective queue head, its previous round is in flight, or a timing
    /// gate is closed. Querying never reorders the queue: a due peer stays
    /// due until [`begin_round`](Self::begin_round) is called or the peer is
    /// forgotten.
    pub fn is_peer_due(&self, peer_id: PeerId, now: Duration) -> Option<bool> {
        let inner = self.lock();
        let state = inner.registered(peer_id)?;
        if !state.role.we_initiate() {
            return None;
        }
        Some(inner.due_at(peer_id, state, now, &self.config))
    }

    /// Start a reconciliation round with a due peer.
    ///
    /// Returns the request parameters to serialize into the outgoing
    /// message, or `None` if the peer is not currently due. On success the
    /// round is flagged in flight, both timing gates are stamped with `now`,
    /// and the peer rotates to the queue tail. The pending set is NOT
    /// drained here; consumption belongs to the round-completion flow.
    pub fn begin_round(&self, peer_id: PeerId, now: Duration) -> Option<ReconciliationRequest> {
        let mut inner = self.lock();
        {
            let state = inner.registered(peer_id)?;
            if !state.role.we_initiate() || !inner.due_at(peer_id, state, now, &self.config) {
                return None;
            }
        }

        let q = (self.config.q * f64::from(Q_PRECISION)).round() as u16;
        let state = inner.registered_mut(peer_id)?;
        state.in_flight = true;
        state.last_round_start = Some(now);
        let set_size = state.pending.len().min(usize::from(u16::MAX)) as u16;
        inner.queue.rotate(peer_id, now);

        tracing::debug!(
            "initiating reconciliation with peer={} set_size={}",
            peer_id,
            set_size
        );
        Some(ReconciliationRequest { set_size, q })
    }

    /// Report that the peer's in-flight round finished (response handled or
    /// timed out). Returns whether a round was in flight.
    pub fn conclude_round(&self, peer_id: PeerId) -> bool {
        let mut inner = self.lock();
        match inner.registered_mut(peer_id) {
            Some(state) if state.in_flight => {
                state.in_flight = false;
                true
            }
            _ => false,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Introspection
    // ─────────────────────────────────────────────────────────────────────

    /// Our reconciliation role for a registered peer.
    pub fn peer_role(&self, peer_id: PeerId) -> Option<Role> {
        self.lock().registered(peer_id).map(|state| state.role)
    }

    /// Size of the pending set for a registered peer.
    pub fn peer_set_size(&self, peer_id: PeerId) -> Option<usize> {
        self.lock().registered(peer_id).map(|state| state.pending.len())
    }

    /// Version negotiated with a registered peer.
    pub fn negotiated_version(&self, peer_id: PeerId) -> Option<u32> {
        self.lock().registered(peer_id).map(|state| state.version)
    }

    /// Short ID of a transaction under a registered peer's connection key,
    /// for the sketch primitive.
    pub fn short_tx_id(&self, peer_id: PeerId, txid: &TxId) -> Option<u32> {
        let inner = self.lock();
        let state = inner.registered(peer_id)?;
        Some(txrecon_core::short_tx_id(&self.hasher, &state.conn_key, txid))
    }
}
