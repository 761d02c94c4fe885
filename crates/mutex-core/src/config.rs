use std::time::Duration;

/// Timing parameters for a single peer. All defaults come from spec §6; nothing here is mutated
/// after construction (the algorithm's safety argument assumes stable timing for the lifetime of
/// a process), so it's shared as `Arc<Config>` rather than behind a lock.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bounded CS tenure: a holder auto-releases after this long.
    pub max_cs_hold: Duration,
    /// Cadence at which we ping every known live peer.
    pub heartbeat_interval: Duration,
    /// Silence duration after which a peer is declared SUSPECTED_DEAD.
    pub heartbeat_timeout: Duration,
    /// Maximum wait for a reply to `ReceiveRequest` before the sweeper re-evaluates.
    pub request_timeout: Duration,
    /// Re-poll cadence for the directory service.
    pub discovery_interval: Duration,
    /// Per-RPC call timeout applied by the transport adapter.
    pub rpc_call_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_cs_hold: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(15),
            heartbeat_timeout: Duration::from_secs(45),
            request_timeout: Duration::from_secs(20),
            discovery_interval: Duration::from_secs(20),
            rpc_call_timeout: Duration::from_secs(5),
        }
    }
}

impl Config {
    pub fn heartbeat_check_interval(&self) -> Duration {
        self.heartbeat_timeout / 2
    }

    pub fn request_timeout_sweep_interval(&self) -> Duration {
        self.request_timeout / 2
    }
}
