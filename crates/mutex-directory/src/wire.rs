use mutex_core::{Endpoint, PeerId};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RegisterBody {
    pub name: String,
    pub endpoint: Endpoint,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ListEntry {
    pub name: String,
    pub endpoint: Endpoint,
}

/// Names are registered as `"peer.mutex." + self_id` (spec §6); this strips that prefix back to
/// a bare `PeerId` for the caller.
pub fn peer_id_from_name(name: &str, prefix: &str) -> Option<PeerId> {
    name.strip_prefix(prefix).and_then(|id| PeerId::new(id).ok())
}

pub fn name_for(prefix: &str, id: &PeerId) -> String {
    format!("{prefix}{id}")
}
