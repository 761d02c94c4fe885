use std::{
    collections::{HashMap, HashSet, VecDeque},
    time::Instant,
};

use crate::id::{Endpoint, PeerId};

/// The three states of the peer mutual-exclusion machine (spec §3, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum CSState {
    Released,
    Wanted,
    Held,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Liveness {
    Live,
    SuspectedDead,
}

/// What we know about a peer other than ourselves.
#[derive(Debug, Clone)]
pub struct PeerRecord {
    pub endpoint: Endpoint,
    pub last_seen: Instant,
    pub liveness: Liveness,
}

impl PeerRecord {
    pub fn new(endpoint: Endpoint, now: Instant) -> Self {
        Self {
            endpoint,
            last_seen: now,
            liveness: Liveness::Live,
        }
    }
}

/// Ordered (by insertion), duplicate-free collection of peers we owe a `ReceiveOK` once we
/// release. A `HashSet` side index keeps `contains`/`push_back_if_absent` O(1) without scanning
/// the `VecDeque`, which matters once a holder has deferred many waiters.
#[derive(Debug, Default)]
pub struct DeferredQueue {
    order: VecDeque<PeerId>,
    members: HashSet<PeerId>,
}

impl DeferredQueue {
    pub fn push_back_if_absent(&mut self, id: PeerId) {
        if self.members.insert(id.clone()) {
            self.order.push_back(id);
        }
    }

    pub fn drain(&mut self) -> Vec<PeerId> {
        self.members.clear();
        self.order.drain(..).collect()
    }

    pub fn remove(&mut self, id: &PeerId) {
        if self.members.remove(id) {
            self.order.retain(|p| p != id);
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// A request we've sent and are still waiting on a reply for.
#[derive(Debug, Clone, Copy)]
pub struct PendingRequest {
    pub sent_at: Instant,
}

/// All mutable state guarded by the peer's single mutex (spec §5). Kept as a plain struct rather
/// than scattered fields so the whole thing can be swapped/inspected atomically under the lock.
#[derive(Debug)]
pub struct PeerCore {
    pub self_id: PeerId,
    pub state: CSState,
    /// Set exactly on entering WANTED, cleared on entering RELEASED (invariant I6).
    pub request_ts: Option<u64>,
    pub ok_set: HashSet<PeerId>,
    pub pending: HashMap<PeerId, PendingRequest>,
    pub deferred: DeferredQueue,
    pub peers: HashMap<PeerId, PeerRecord>,
    /// Bumped on every RELEASED->WANTED transition, i.e. once per CS attempt. Lets a lease timer
    /// armed for a past HELD epoch recognize it's stale instead of releasing a later epoch.
    pub generation: u64,
}

impl PeerCore {
    pub fn new(self_id: PeerId) -> Self {
        Self {
            self_id,
            state: CSState::Released,
            request_ts: None,
            ok_set: HashSet::new(),
            pending: HashMap::new(),
            deferred: DeferredQueue::default(),
            peers: HashMap::new(),
            generation: 0,
        }
    }

    pub fn live_peer_ids(&self) -> HashSet<PeerId> {
        self.peers
            .iter()
            .filter(|(_, r)| r.liveness == Liveness::Live)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// The decision rule from spec §4.1/§4.5: compares `(self_ts, self_id)` against
    /// `(ts_from, from)` using the total order on the pair, tie-broken by `PeerId`.
    pub fn has_priority_over(&self, ts_from: u64, from: &PeerId) -> bool {
        let self_ts = self.request_ts.expect("priority check requires WANTED");
        (self_ts, &self.self_id) < (ts_from, from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> PeerId {
        PeerId::new(s).unwrap()
    }

    #[test]
    fn deferred_queue_dedupes_and_preserves_order() {
        let mut q = DeferredQueue::default();
        q.push_back_if_absent(id("b"));
        q.push_back_if_absent(id("a"));
        q.push_back_if_absent(id("b"));
        assert_eq!(q.len(), 2);
        assert_eq!(q.drain(), vec![id("b"), id("a")]);
        assert!(q.is_empty());
    }

    #[test]
    fn deferred_queue_remove_keeps_remaining_order() {
        let mut q = DeferredQueue::default();
        q.push_back_if_absent(id("a"));
        q.push_back_if_absent(id("b"));
        q.push_back_if_absent(id("c"));
        q.remove(&id("b"));
        assert_eq!(q.drain(), vec![id("a"), id("c")]);
    }

    #[test]
    fn tie_break_uses_peer_id_order() {
        let mut core = PeerCore::new(id("a"));
        core.state = CSState::Wanted;
        core.request_ts = Some(100);
        // Equal timestamp, "a" < "b" => we have priority, so "b" must defer.
        assert!(core.has_priority_over(100, &id("b")));
        // Equal timestamp against "A" < "a" lexicographically => they have priority.
        assert!(!core.has_priority_over(100, &id("A")));
    }
}
