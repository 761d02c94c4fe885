use mutex_core::{Endpoint, PeerId};

/// Wire body for `POST /rpc/receive_request`. Carries the requester's own callback endpoint so
/// the receiving peer can auto-register it (spec §4.2 self-healing membership) without a prior
/// directory round-trip.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReceiveRequestBody {
    pub from: PeerId,
    pub ts: u64,
    pub callback_endpoint: Endpoint,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum ReceiveRequestReply {
    Ok,
    Wait,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReceiveOkBody {
    pub from: PeerId,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReceiveHeartbeatBody {
    pub from: PeerId,
    pub ts: u64,
    pub callback_endpoint: Endpoint,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Ack;
