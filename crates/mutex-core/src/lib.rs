//! Core state machine for a fully decentralized distributed mutual-exclusion peer: a
//! Ricart-Agrawala request/reply algorithm hardened with heartbeat-based failure detection,
//! per-request timeouts, and a bounded critical-section lease.
//!
//! This crate has no opinion on the wire format or on how peers discover each other; see the
//! `PeerTransport` and `Directory` traits for those seams. `mutex-transport` and
//! `mutex-directory` provide concrete implementations.

pub mod clock;
pub mod config;
pub mod directory;
pub mod error;
pub mod id;
pub mod peer;
pub mod spawn;
pub mod state;
pub mod transport;

pub use clock::LamportClock;
pub use config::Config;
pub use directory::Directory;
pub use error::{Error, Result};
pub use id::{Endpoint, PeerId};
pub use peer::{Peer, PeerSnapshot, ReleaseReason};
pub use state::{CSState, Liveness};
pub use transport::{HeartbeatMsg, OkMsg, PeerTransport, RequestDecision, RequestMsg};
