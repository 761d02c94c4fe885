use async_trait::async_trait;
use mutex_core::{Directory, Endpoint, PeerId};

use crate::wire::{name_for, peer_id_from_name, ListEntry, RegisterBody};

const NAME_PREFIX: &str = "peer.mutex.";

/// Talks to the standalone `directoryd` binary over HTTP. The directory is a thin registry, not
/// a membership authority: a lookup failure just means this discovery tick is skipped (spec §4.3,
/// §7) — the peer keeps whatever membership it already learned.
pub struct HttpDirectoryClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpDirectoryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Directory for HttpDirectoryClient {
    async fn register(&self, id: PeerId, endpoint: Endpoint) -> anyhow::Result<()> {
        let body = RegisterBody {
            name: name_for(NAME_PREFIX, &id),
            endpoint,
        };
        self.http
            .post(format!("{}/register", self.base_url))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn list(&self) -> anyhow::Result<Vec<(PeerId, Endpoint)>> {
        let entries: Vec<ListEntry> = self
            .http
            .get(format!("{}/list?prefix={NAME_PREFIX}", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(entries
            .into_iter()
            .filter_map(|e| peer_id_from_name(&e.name, NAME_PREFIX).map(|id| (id, e.endpoint)))
            .collect())
    }

    async fn remove(&self, id: &PeerId) -> anyhow::Result<()> {
        let name = name_for(NAME_PREFIX, id);
        self.http
            .delete(format!("{}/remove/{name}", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
