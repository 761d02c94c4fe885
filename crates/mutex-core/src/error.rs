use crate::id::PeerId;

/// The error kinds enumerated by the design's error handling policy (spec §7). Most of these are
/// not fatal: the caller or the background loop that produced them decides whether to log and
/// move on, or (only for `Fatal`) abort the peer.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid state: {operation} requires state {expected:?}, found {found:?}")]
    InvalidState {
        operation: &'static str,
        expected: &'static str,
        found: crate::state::CSState,
    },

    #[error("transport error calling {peer}: {source:#}")]
    TransientTransport {
        peer: PeerId,
        #[source]
        source: anyhow::Error,
    },

    #[error("directory unavailable: {0:#}")]
    DirectoryUnavailable(#[source] anyhow::Error),

    #[error("fatal: {0}")]
    Fatal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
