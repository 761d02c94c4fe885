use async_trait::async_trait;
use mutex_core::{Directory, Endpoint, PeerId};

/// Fixed, comma-separated peer list supplied on the command line (spec §6C `--static-peers`).
/// `register`/`remove` are no-ops: there's no registry to update, the list is the whole world.
pub struct StaticDirectoryClient {
    peers: Vec<(PeerId, Endpoint)>,
}

impl StaticDirectoryClient {
    pub fn new(peers: Vec<(PeerId, Endpoint)>) -> Self {
        Self { peers }
    }

    /// Parses `id1=host:port,id2=host:port`.
    pub fn parse(spec: &str) -> anyhow::Result<Self> {
        let mut peers = Vec::new();
        for entry in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (id, endpoint) = entry
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("invalid static peer entry {entry:?}, expected id=host:port"))?;
            peers.push((PeerId::new(id)?, Endpoint::from(endpoint)));
        }
        Ok(Self::new(peers))
    }
}

#[async_trait]
impl Directory for StaticDirectoryClient {
    async fn register(&self, _id: PeerId, _endpoint: Endpoint) -> anyhow::Result<()> {
        Ok(())
    }

    async fn list(&self) -> anyhow::Result<Vec<(PeerId, Endpoint)>> {
        Ok(self.peers.clone())
    }

    async fn remove(&self, _id: &PeerId) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_comma_separated_list() {
        let client = StaticDirectoryClient::parse("a=127.0.0.1:9001,b=127.0.0.1:9002").unwrap();
        let list = client.list().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].0, PeerId::new("a").unwrap());
    }

    #[tokio::test]
    async fn rejects_malformed_entry() {
        assert!(StaticDirectoryClient::parse("a-no-equals-sign").is_err());
    }
}
