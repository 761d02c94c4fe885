//! Implementations of `mutex-core`'s `Directory` trait: an HTTP client talking to the standalone
//! `directoryd` registry binary, and a zero-dependency static list for fixed-membership runs.

pub mod http_client;
pub mod static_client;
pub mod wire;

pub use http_client::HttpDirectoryClient;
pub use static_client::StaticDirectoryClient;
