//! JSON-over-HTTP wire binding for `mutex-core`'s `PeerTransport` trait: an `axum` server
//! exposing the three RPCs plus health/debug endpoints, and a `reqwest`-backed client.

pub mod client;
pub mod server;
pub mod wire;

pub use client::HttpPeerRpcClient;
pub use server::peer_router;
