use std::sync::Arc;

use axum::{extract::State, routing::{get, post}, Json, Router};
use mutex_core::Peer;

use crate::wire::{
    Ack, ReceiveHeartbeatBody, ReceiveOkBody, ReceiveRequestBody, ReceiveRequestReply,
};

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] mutex_core::Error),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        let status = match &self {
            ApiError::Core(mutex_core::Error::InvalidState { .. }) => StatusCode::CONFLICT,
            ApiError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// Builds the three-RPC surface plus `/healthz` and `/debug/stats` (spec §6A) for one peer.
pub fn peer_router(peer: Arc<Peer>) -> Router {
    Router::new()
        .route("/rpc/receive_request", post(receive_request))
        .route("/rpc/receive_ok", post(receive_ok))
        .route("/rpc/receive_heartbeat", post(receive_heartbeat))
        .route("/healthz", get(healthz))
        .route("/debug/stats", get(debug_stats))
        .with_state(peer)
}

async fn receive_request(
    State(peer): State<Arc<Peer>>,
    Json(body): Json<ReceiveRequestBody>,
) -> Result<Json<ReceiveRequestReply>, ApiError> {
    let granted = peer
        .receive_request(body.from, body.ts, body.callback_endpoint)
        .await?;
    Ok(Json(if granted {
        ReceiveRequestReply::Ok
    } else {
        ReceiveRequestReply::Wait
    }))
}

async fn receive_ok(State(peer): State<Arc<Peer>>, Json(body): Json<ReceiveOkBody>) -> Json<Ack> {
    peer.receive_ok(body.from);
    Json(Ack)
}

async fn receive_heartbeat(
    State(peer): State<Arc<Peer>>,
    Json(body): Json<ReceiveHeartbeatBody>,
) -> Json<Ack> {
    peer.receive_heartbeat(body.from, body.callback_endpoint, body.ts);
    Json(Ack)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn debug_stats(State(peer): State<Arc<Peer>>) -> Json<mutex_core::PeerSnapshot> {
    Json(peer.snapshot())
}
