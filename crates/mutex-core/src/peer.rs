use std::{collections::HashMap, sync::Arc, time::Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::{
    clock::LamportClock,
    config::Config,
    directory::Directory,
    error::{Error, Result},
    id::{Endpoint, PeerId},
    spawn::{spawn, spawn_with_cancel},
    state::{CSState, Liveness, PeerCore, PeerRecord, PendingRequest},
    transport::{HeartbeatMsg, OkMsg, PeerTransport, RequestDecision, RequestMsg},
};

/// Why a `ReleaseCS` happened, for logging only — both paths are otherwise identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseReason {
    User,
    LeaseExpired,
}

/// Point-in-time view of a peer, for the `STATUS`/`/debug/stats` surfaces.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PeerSnapshot {
    pub self_id: PeerId,
    pub state: CSState,
    pub generation: u64,
    pub ok_set_len: usize,
    pub pending_len: usize,
    pub deferred_len: usize,
    pub live_peers: usize,
    pub suspected_dead_peers: usize,
}

/// A single peer in the mutual-exclusion group: the State Core, Request Protocol Handler,
/// Membership & Failure Detector, and Timer Subsystem rolled into one, exactly as the spec's
/// component design describes them as facets of one object guarded by one lock.
pub struct Peer {
    self_id: PeerId,
    listen_endpoint: Endpoint,
    clock: LamportClock,
    config: Arc<Config>,
    transport: Arc<dyn PeerTransport>,
    directory: Arc<dyn Directory>,
    core: Mutex<PeerCore>,
    cs_granted: Notify,
}

impl Peer {
    pub fn new(
        self_id: PeerId,
        listen_endpoint: Endpoint,
        config: Arc<Config>,
        transport: Arc<dyn PeerTransport>,
        directory: Arc<dyn Directory>,
    ) -> Arc<Self> {
        Arc::new(Self {
            core: Mutex::new(PeerCore::new(self_id.clone())),
            self_id,
            listen_endpoint,
            clock: LamportClock::new(),
            config,
            transport,
            directory,
            cs_granted: Notify::new(),
        })
    }

    pub fn self_id(&self) -> &PeerId {
        &self.self_id
    }

    pub fn snapshot(&self) -> PeerSnapshot {
        let core = self.core.lock();
        let (live, dead) = core
            .peers
            .values()
            .fold((0, 0), |(live, dead), r| match r.liveness {
                Liveness::Live => (live + 1, dead),
                Liveness::SuspectedDead => (live, dead + 1),
            });
        PeerSnapshot {
            self_id: self.self_id.clone(),
            state: core.state,
            generation: core.generation,
            ok_set_len: core.ok_set.len(),
            pending_len: core.pending.len(),
            deferred_len: core.deferred.len(),
            live_peers: live,
            suspected_dead_peers: dead,
        }
    }

    pub fn known_peers(&self) -> Vec<(PeerId, Endpoint, Liveness)> {
        self.core
            .lock()
            .peers
            .iter()
            .map(|(id, r)| (id.clone(), r.endpoint.clone(), r.liveness))
            .collect()
    }

    // ---- State Core public operations (spec §4.1) ----------------------------------------

    /// Requests the critical section and waits until it is granted. Fails immediately with
    /// `InvalidState` if not currently RELEASED; otherwise only returns once HELD.
    pub async fn request_cs(self: &Arc<Self>) -> Result<()> {
        let targets = {
            let mut core = self.core.lock();
            if core.state != CSState::Released {
                return Err(Error::InvalidState {
                    operation: "request_cs",
                    expected: "RELEASED",
                    found: core.state,
                });
            }
            let ts = self.clock.tick();
            core.request_ts = Some(ts);
            core.state = CSState::Wanted;
            core.generation += 1;
            core.ok_set.clear();
            let now = Instant::now();
            let targets: Vec<(PeerId, Endpoint)> = core
                .live_peer_ids()
                .into_iter()
                .filter_map(|id| core.peers.get(&id).map(|r| (id, r.endpoint.clone())))
                .collect();
            core.pending = targets
                .iter()
                .map(|(id, _)| (id.clone(), PendingRequest { sent_at: now }))
                .collect();
            targets
        };

        if targets.is_empty() {
            self.try_enter_cs();
        } else {
            let ts = self.core.lock().request_ts.expect("just set");
            self.broadcast_requests(ts, targets).await;
        }

        loop {
            let notified = self.cs_granted.notified();
            if self.core.lock().state == CSState::Held {
                return Ok(());
            }
            notified.await;
        }
    }

    /// Sends `ReceiveRequest` to every target and folds the synchronous decision straight back
    /// into our own bookkeeping: a `Granted` reply is handed to `receive_ok` exactly as if the
    /// granting peer had separately called us back, because that is the only channel spec §4.2
    /// promises — there is no second, independently-fallible RPC for the common case.
    async fn broadcast_requests(self: &Arc<Self>, ts: u64, targets: Vec<(PeerId, Endpoint)>) {
        let mut calls = FuturesUnordered::new();
        for (id, endpoint) in targets {
            let transport = self.transport.clone();
            let msg = RequestMsg {
                from: self.self_id.clone(),
                ts,
            };
            calls.push(async move {
                let res = transport.send_request(&endpoint, msg).await;
                (id, res)
            });
        }
        let mut granted = Vec::new();
        while let Some((id, res)) = calls.next().await {
            match res {
                Ok(RequestDecision::Granted) => granted.push(id),
                Ok(RequestDecision::Deferred) => {}
                Err(source) => {
                    let err = Error::TransientTransport { peer: id, source };
                    tracing::warn!(error = %err, "send_request failed");
                }
            }
        }
        for id in granted {
            self.receive_ok(id);
        }
    }

    /// Releases the critical section. A no-op (not an error) if not currently HELD, since
    /// `ReleaseCS(LEASE_EXPIRED)` may legitimately race a concurrent `ReleaseCS(USER)`.
    pub async fn release_cs(self: &Arc<Self>) -> Result<()> {
        self.do_release(ReleaseReason::User).await;
        Ok(())
    }

    async fn do_release(self: &Arc<Self>, reason: ReleaseReason) -> bool {
        let to_notify = {
            let mut core = self.core.lock();
            if core.state != CSState::Held {
                return false;
            }
            core.state = CSState::Released;
            core.request_ts = None;
            core.ok_set.clear();
            core.pending.clear();
            let drained = core.deferred.drain();
            drained
                .into_iter()
                .filter_map(|id| core.peers.get(&id).map(|r| (id, r.endpoint.clone())))
                .collect::<Vec<_>>()
        };
        tracing::info!(?reason, waiters = to_notify.len(), "released");
        let mut calls = FuturesUnordered::new();
        for (id, endpoint) in to_notify {
            let transport = self.transport.clone();
            let msg = OkMsg {
                from: self.self_id.clone(),
            };
            calls.push(async move {
                let res = transport.send_ok(&endpoint, msg).await;
                (id, res)
            });
        }
        while let Some((id, res)) = calls.next().await {
            if let Err(source) = res {
                let err = Error::TransientTransport { peer: id, source };
                tracing::warn!(error = %err, "send_ok failed");
            }
        }
        true
    }

    // ---- Request Protocol Handler (spec §4.1, §4.2) --------------------------------------

    /// The reply this returns IS the grant (spec §4.2's synchronous decision): the caller's
    /// transport hands it straight back to the requester in the same round trip, so there is no
    /// separate callback to make here, and nothing for this peer's own grant to lose to a
    /// transient failure on a second RPC.
    pub async fn receive_request(
        self: &Arc<Self>,
        from: PeerId,
        ts: u64,
        endpoint: Endpoint,
    ) -> Result<bool> {
        self.clock.observe(ts);
        let defer = {
            let mut core = self.core.lock();
            self.touch_peer_locked(&mut core, &from, endpoint);
            let defer = match core.state {
                CSState::Held => true,
                CSState::Wanted => core.has_priority_over(ts, &from),
                CSState::Released => false,
            };
            if defer {
                core.deferred.push_back_if_absent(from);
            }
            defer
        };
        Ok(!defer)
    }

    /// Deliberately narrower than spec §7's `UnknownSender` policy: unlike `receive_request`/
    /// `receive_heartbeat`, this does not auto-register a `PeerRecord` for a `from` id we've never
    /// seen, because `OkMsg` carries no endpoint to register it with (see DESIGN.md). An OK from
    /// a truly unknown id is still folded into `ok_set` so it can't strand a pending request.
    pub fn receive_ok(self: &Arc<Self>, from: PeerId) {
        {
            let mut core = self.core.lock();
            if core.state == CSState::Wanted {
                core.ok_set.insert(from.clone());
                core.pending.remove(&from);
            }
        }
        self.try_enter_cs();
    }

    pub fn receive_heartbeat(self: &Arc<Self>, from: PeerId, endpoint: Endpoint, ts: u64) {
        self.clock.observe(ts);
        let mut core = self.core.lock();
        self.touch_peer_locked(&mut core, &from, endpoint);
    }

    fn touch_peer_locked(&self, core: &mut PeerCore, from: &PeerId, endpoint: Endpoint) {
        let now = Instant::now();
        match core.peers.get_mut(from) {
            Some(r) => {
                r.last_seen = now;
                r.endpoint = endpoint;
                if r.liveness == Liveness::SuspectedDead {
                    tracing::info!(peer = %from, "peer recovered");
                    r.liveness = Liveness::Live;
                }
            }
            None => {
                tracing::debug!(peer = %from, "auto-registering unknown sender");
                core.peers
                    .insert(from.clone(), PeerRecord::new(endpoint, now));
            }
        }
    }

    /// The sole path into HELD (spec §4.1 `maybe_enter_CS`). Safe to call whenever the set of
    /// peers we're waiting on might have shrunk: after an OK, after a peer is marked dead, and
    /// after the request-timeout sweeper treats a dead peer as OK-equivalent.
    fn try_enter_cs(self: &Arc<Self>) {
        let entered_generation = {
            let mut core = self.core.lock();
            if core.state == CSState::Wanted && core.pending.is_empty() {
                core.state = CSState::Held;
                Some(core.generation)
            } else {
                None
            }
        };
        if let Some(generation) = entered_generation {
            tracing::info!("entered CS");
            self.cs_granted.notify_waiters();
            self.arm_lease_timer(generation);
        }
    }

    fn arm_lease_timer(self: &Arc<Self>, generation: u64) {
        let this = self.clone();
        let max_cs_hold = this.config.max_cs_hold;
        spawn(
            tracing::info_span!("lease_timer", peer = %this.self_id, generation),
            async move {
                tokio::time::sleep(max_cs_hold).await;
                let still_current = {
                    let core = this.core.lock();
                    core.state == CSState::Held && core.generation == generation
                };
                if still_current {
                    tracing::warn!("CS lease expired, auto-releasing");
                    this.do_release(ReleaseReason::LeaseExpired).await;
                }
                Ok(())
            },
        );
    }

    // ---- Membership & Failure Detector / Timer Subsystem background loops (spec §4.3, §4.4) --

    /// Starts the four non-RPC background activities every running peer needs (spec §5): the
    /// fifth, the RPC serving loop, is owned by whoever builds the transport (the binary or a
    /// test harness), not by `Peer` itself. Returns join handles so the caller can await clean
    /// shutdown.
    pub fn spawn_background_tasks(
        self: &Arc<Self>,
        cancel: CancellationToken,
    ) -> Vec<tokio::task::JoinHandle<()>> {
        let id = self.self_id.clone();
        vec![
            spawn_with_cancel(
                tracing::info_span!("heartbeat_sender", peer = %id),
                cancel.clone(),
                self.clone().heartbeat_sender_loop(),
            ),
            spawn_with_cancel(
                tracing::info_span!("heartbeat_checker", peer = %id),
                cancel.clone(),
                self.clone().heartbeat_checker_loop(),
            ),
            spawn_with_cancel(
                tracing::info_span!("request_sweeper", peer = %id),
                cancel.clone(),
                self.clone().request_sweeper_loop(),
            ),
            spawn_with_cancel(
                tracing::info_span!("discovery", peer = %id),
                cancel,
                self.clone().discovery_loop(),
            ),
        ]
    }

    async fn heartbeat_sender_loop(self: Arc<Self>) -> anyhow::Result<()> {
        let mut ticker = tokio::time::interval(self.config.heartbeat_interval);
        loop {
            ticker.tick().await;
            let ts = self.clock.tick();
            let targets: Vec<(PeerId, Endpoint)> = {
                let core = self.core.lock();
                core.peers
                    .iter()
                    .map(|(id, r)| (id.clone(), r.endpoint.clone()))
                    .collect()
            };
            let mut calls = FuturesUnordered::new();
            for (pid, endpoint) in targets {
                let transport = self.transport.clone();
                let msg = HeartbeatMsg {
                    from: self.self_id.clone(),
                    ts,
                };
                calls.push(
                    async move { (pid, transport.send_heartbeat(&endpoint, msg).await) }
                        .in_current_span(),
                );
            }
            while let Some((pid, res)) = calls.next().await {
                if let Err(source) = res {
                    let err = Error::TransientTransport { peer: pid, source };
                    tracing::debug!(error = %err, "heartbeat send failed");
                }
            }
        }
    }

    async fn heartbeat_checker_loop(self: Arc<Self>) -> anyhow::Result<()> {
        let mut ticker = tokio::time::interval(self.config.heartbeat_check_interval());
        loop {
            ticker.tick().await;
            let mut newly_dead = Vec::new();
            {
                let mut core = self.core.lock();
                let timeout = self.config.heartbeat_timeout;
                let now = Instant::now();
                for (id, record) in core.peers.iter_mut() {
                    if record.liveness == Liveness::Live && now.duration_since(record.last_seen) > timeout {
                        record.liveness = Liveness::SuspectedDead;
                        newly_dead.push(id.clone());
                    }
                }
                for id in &newly_dead {
                    core.deferred.remove(id);
                    if core.pending.remove(id).is_some() && core.state == CSState::Wanted {
                        core.ok_set.insert(id.clone());
                    }
                }
            }
            for id in &newly_dead {
                tracing::warn!(peer = %id, "peer suspected dead");
            }
            if !newly_dead.is_empty() {
                self.try_enter_cs();
            }
        }
    }

    async fn request_sweeper_loop(self: Arc<Self>) -> anyhow::Result<()> {
        let mut ticker = tokio::time::interval(self.config.request_timeout_sweep_interval());
        loop {
            ticker.tick().await;
            let mut became_ok = false;
            {
                let mut core = self.core.lock();
                if core.state != CSState::Wanted {
                    continue;
                }
                let request_timeout = self.config.request_timeout;
                let now = Instant::now();
                let liveness: HashMap<PeerId, Liveness> = core
                    .peers
                    .iter()
                    .map(|(id, r)| (id.clone(), r.liveness))
                    .collect();
                let stale: Vec<PeerId> = core
                    .pending
                    .iter()
                    .filter(|(_, p)| now.duration_since(p.sent_at) > request_timeout)
                    .map(|(id, _)| id.clone())
                    .collect();
                for id in stale {
                    match liveness.get(&id) {
                        Some(Liveness::SuspectedDead) => {
                            core.pending.remove(&id);
                            core.ok_set.insert(id);
                            became_ok = true;
                        }
                        _ => {
                            if let Some(p) = core.pending.get_mut(&id) {
                                p.sent_at = now;
                            }
                        }
                    }
                }
            }
            if became_ok {
                self.try_enter_cs();
            }
        }
    }

    async fn discovery_loop(self: Arc<Self>) -> anyhow::Result<()> {
        if let Err(e) = self
            .directory
            .register(self.self_id.clone(), self.listen_endpoint.clone())
            .await
        {
            let err = Error::DirectoryUnavailable(e);
            tracing::warn!(error = %err, "initial directory registration failed");
        }
        let mut ticker = tokio::time::interval(self.config.discovery_interval);
        loop {
            ticker.tick().await;
            match self.directory.list().await {
                Ok(listing) => {
                    let mut core = self.core.lock();
                    let now = Instant::now();
                    for (id, endpoint) in listing {
                        if id == self.self_id {
                            continue;
                        }
                        core.peers
                            .entry(id)
                            .or_insert_with(|| PeerRecord::new(endpoint, now));
                    }
                }
                Err(e) => {
                    let err = Error::DirectoryUnavailable(e);
                    tracing::debug!(error = %err, "directory unavailable this tick");
                }
            }
        }
    }

    /// Best-effort orderly shutdown: unregisters from the directory, bounded by the transport's
    /// own call timeout so shutdown never hangs on a dead directory.
    pub async fn unregister(&self) {
        if let Err(e) = self.directory.remove(&self.self_id).await {
            let err = Error::DirectoryUnavailable(e);
            tracing::debug!(error = %err, "directory unregister failed during shutdown");
        }
    }
}
