//! Round-robin scheduling of reconciliation rounds.
//!
//! Initiator-role peers wait in a FIFO queue. The queue is only reordered
//! when a round actually starts; due-ness queries never mutate it, so a due
//! head peer stays due until its round begins or the peer is forgotten.

use std::collections::VecDeque;
use std::time::Duration;

use txrecon_core::PeerId;

/// FIFO of initiator-role peers plus the global pacing stamp.
#[derive(Debug, Default)]
pub(crate) struct InitiatorQueue {
    queue: VecDeque<PeerId>,
    /// When the last round, with any peer, was started.
    last_round_start: Option<Duration>,
}

impl InitiatorQueue {
    /// Append a newly registered initiator to the tail.
    pub fn push_back(&mut self, peer_id: PeerId) {
        self.queue.push_back(peer_id);
    }

    /// Splice a peer out wherever it sits. No-op if absent.
    pub fn remove(&mut self, peer_id: PeerId) {
        self.queue.retain(|id| *id != peer_id);
    }

    /// First queued peer for which `blocked` is false.
    ///
    /// A head peer whose previous round is still in flight must not stall
    /// the peers behind it, so callers pass the in-flight check as `blocked`.
    pub fn effective_head(&self, mut blocked: impl FnMut(PeerId) -> bool) -> Option<PeerId> {
        self.queue.iter().copied().find(|id| !blocked(*id))
    }

    /// Whether the global pacing gate is open at `now`.
    ///
    /// Bounds the rate of round starts across all peers, independent of
    /// queue depth.
    pub fn pacing_open(&self, now: Duration, interval: Duration) -> bool {
        self.last_round_start.map_or(true, |t| now >= t + interval)
    }

    /// Move a peer to the tail and stamp the pacing gate. Called when a
    /// round actually starts.
    pub fn rotate(&mut self, peer_id: PeerId, now: Duration) {
        self.remove(peer_id);
        self.queue.push_back(peer_id);
        self.last_round_start = Some(now);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}
