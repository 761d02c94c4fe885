use async_trait::async_trait;

use crate::id::{Endpoint, PeerId};

/// Naming-service seam (spec §6B). A peer has no built-in notion of the rest of the membership;
/// it periodically asks a `Directory` who else exists and how to reach them. Kept separate from
/// `PeerTransport` because discovery and RPC delivery fail independently: the directory can be
/// unreachable while every known peer is still reachable directly, and vice versa.
#[async_trait]
pub trait Directory: Send + Sync + 'static {
    async fn register(&self, id: PeerId, endpoint: Endpoint) -> anyhow::Result<()>;
    async fn list(&self) -> anyhow::Result<Vec<(PeerId, Endpoint)>>;
    async fn remove(&self, id: &PeerId) -> anyhow::Result<()>;
}
