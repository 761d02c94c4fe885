use std::{sync::Arc, time::Duration};

use mutex_core::{Config, Directory, Endpoint, Peer, PeerId};
use mutex_directory::StaticDirectoryClient;
use mutex_transport::{peer_router, HttpPeerRpcClient};
use tokio_util::sync::CancellationToken;

pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

pub fn test_scale_config() -> Config {
    Config {
        max_cs_hold: Duration::from_millis(200),
        heartbeat_interval: Duration::from_millis(40),
        heartbeat_timeout: Duration::from_millis(150),
        request_timeout: Duration::from_millis(150),
        discovery_interval: Duration::from_millis(30),
        rpc_call_timeout: Duration::from_millis(500),
    }
}

pub struct TestPeer {
    pub peer: Arc<Peer>,
    pub endpoint: Endpoint,
    pub cancel: CancellationToken,
    _background: Vec<tokio::task::JoinHandle<()>>,
    _server: tokio::task::JoinHandle<()>,
}

impl TestPeer {
    pub fn id(&self) -> PeerId {
        self.peer.self_id().clone()
    }
}

impl Drop for TestPeer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Binds one listener per id, shares a single `StaticDirectoryClient` listing all of them (as a
/// real `directoryd` would), and lets each peer's own discovery loop learn the others — the same
/// path a production deployment takes, just with a test-scale `discovery_interval`.
pub async fn spawn_group(ids: &[&str]) -> Vec<TestPeer> {
    let mut bound = Vec::new();
    for id in ids {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        bound.push((PeerId::new(*id).unwrap(), Endpoint(addr.to_string()), listener));
    }
    let roster: Vec<(PeerId, Endpoint)> = bound
        .iter()
        .map(|(id, endpoint, _)| (id.clone(), endpoint.clone()))
        .collect();
    let directory: Arc<dyn Directory> = Arc::new(StaticDirectoryClient::new(roster));

    let mut peers = Vec::new();
    for (id, endpoint, listener) in bound {
        let config = Arc::new(test_scale_config());
        let transport = Arc::new(
            HttpPeerRpcClient::new(endpoint.clone(), config.rpc_call_timeout).unwrap(),
        );
        let peer = Peer::new(id, endpoint.clone(), config, transport, directory.clone());

        let cancel = CancellationToken::new();
        let background = peer.spawn_background_tasks(cancel.clone());

        let app = peer_router(peer.clone());
        let server_cancel = cancel.clone();
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move { server_cancel.cancelled().await })
                .await;
        });

        peers.push(TestPeer {
            peer,
            endpoint,
            cancel,
            _background: background,
            _server: server,
        });
    }
    peers
}

pub async fn wait_until(mut cond: impl FnMut() -> bool, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if cond() {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("condition not met within {timeout:?}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub async fn wait_until_mutually_known(peers: &[TestPeer], timeout: Duration) {
    wait_until(
        || {
            peers
                .iter()
                .all(|p| p.peer.known_peers().len() == peers.len() - 1)
        },
        timeout,
    )
    .await;
}
