use std::time::Duration;

use async_trait::async_trait;
use mutex_core::{Endpoint, HeartbeatMsg, OkMsg, PeerTransport, RequestDecision, RequestMsg};

use crate::wire::{ReceiveHeartbeatBody, ReceiveOkBody, ReceiveRequestBody, ReceiveRequestReply};

/// `reqwest`-backed implementation of `PeerTransport`. Every call is bounded by
/// `rpc_call_timeout`; a peer with many live peers issues these concurrently via
/// `FuturesUnordered` in `mutex-core`, so a single slow/dead peer cannot stall the others.
pub struct HttpPeerRpcClient {
    http: reqwest::Client,
    self_endpoint: Endpoint,
}

impl HttpPeerRpcClient {
    pub fn new(self_endpoint: Endpoint, call_timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(call_timeout).build()?;
        Ok(Self { http, self_endpoint })
    }

    fn url(to: &Endpoint, path: &str) -> String {
        format!("http://{}{path}", to.0)
    }
}

#[async_trait]
impl PeerTransport for HttpPeerRpcClient {
    async fn send_request(&self, to: &Endpoint, msg: RequestMsg) -> anyhow::Result<RequestDecision> {
        let body = ReceiveRequestBody {
            from: msg.from,
            ts: msg.ts,
            callback_endpoint: self.self_endpoint.clone(),
        };
        let reply: ReceiveRequestReply = self
            .http
            .post(Self::url(to, "/rpc/receive_request"))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(match reply {
            ReceiveRequestReply::Ok => RequestDecision::Granted,
            ReceiveRequestReply::Wait => RequestDecision::Deferred,
        })
    }

    async fn send_ok(&self, to: &Endpoint, msg: OkMsg) -> anyhow::Result<()> {
        let body = ReceiveOkBody { from: msg.from };
        self.http
            .post(Self::url(to, "/rpc/receive_ok"))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn send_heartbeat(&self, to: &Endpoint, msg: HeartbeatMsg) -> anyhow::Result<()> {
        let body = ReceiveHeartbeatBody {
            from: msg.from,
            ts: msg.ts,
            callback_endpoint: self.self_endpoint.clone(),
        };
        self.http
            .post(Self::url(to, "/rpc/receive_heartbeat"))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
