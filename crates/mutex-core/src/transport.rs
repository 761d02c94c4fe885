use async_trait::async_trait;

use crate::id::{Endpoint, PeerId};

/// A `REQUEST` message: "I want the critical section as of logical time `ts`."
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RequestMsg {
    pub from: PeerId,
    pub ts: u64,
}

/// An `OK` reply, granting permission to enter the critical section.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OkMsg {
    pub from: PeerId,
}

/// A heartbeat, carrying the sender's current Lamport clock so recipients can fold it in.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HeartbeatMsg {
    pub from: PeerId,
    pub ts: u64,
}

/// The synchronous decision a `ReceiveRequest` reply conveys (spec §4.2): the callee computes
/// this under its own lock and hands it back in the same round trip, so the caller must treat
/// `Granted` exactly like an inbound `ReceiveOK` from that peer instead of waiting on a second,
/// independently-fallible `ReceiveOK` call to learn the same thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDecision {
    Granted,
    Deferred,
}

/// Everything a peer needs from the network, abstracted away from the wire format. Grounded in
/// the same seam the DHT worker draws between its state machine and the UDP framer: the core
/// never knows how a message got to the other side, only that it arrived or timed out.
#[async_trait]
pub trait PeerTransport: Send + Sync + 'static {
    async fn send_request(&self, to: &Endpoint, msg: RequestMsg) -> anyhow::Result<RequestDecision>;
    async fn send_ok(&self, to: &Endpoint, msg: OkMsg) -> anyhow::Result<()>;
    async fn send_heartbeat(&self, to: &Endpoint, msg: HeartbeatMsg) -> anyhow::Result<()>;
}
