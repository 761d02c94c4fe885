use std::{net::SocketAddr, time::Duration};

use clap::Parser;
use mutex_core::{Config, PeerId};

fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Process-level CLI for a single mutex-peer (spec §6C). Flag > env > built-in default, the same
/// precedence `clap`'s `env` attribute gives for free.
#[derive(Parser, Debug)]
#[command(name = "mutex-peer", about = "A fully decentralized distributed mutual-exclusion peer")]
pub struct Opts {
    /// This peer's identifier; also used to derive its directory registration name.
    pub peer_id: String,

    #[arg(long, env = "RQMX_LISTEN_ADDR", default_value = "127.0.0.1:0")]
    pub listen_addr: SocketAddr,

    /// `http://host:port` of a running directoryd. Mutually exclusive with `--static-peers`.
    #[arg(long, env = "RQMX_DIRECTORY")]
    pub directory: Option<String>,

    /// Comma-separated `id=host:port` list. Mutually exclusive with `--directory`.
    #[arg(long, env = "RQMX_STATIC_PEERS")]
    pub static_peers: Option<String>,

    #[arg(long, env = "RQMX_MAX_CS_HOLD", value_parser = parse_duration)]
    pub max_cs_hold: Option<Duration>,

    #[arg(long, env = "RQMX_HEARTBEAT_INTERVAL", value_parser = parse_duration)]
    pub heartbeat_interval: Option<Duration>,

    #[arg(long, env = "RQMX_HEARTBEAT_TIMEOUT", value_parser = parse_duration)]
    pub heartbeat_timeout: Option<Duration>,

    #[arg(long, env = "RQMX_REQUEST_TIMEOUT", value_parser = parse_duration)]
    pub request_timeout: Option<Duration>,

    #[arg(long, env = "RQMX_DISCOVERY_INTERVAL", value_parser = parse_duration)]
    pub discovery_interval: Option<Duration>,

    #[arg(short = 'v', long, env = "RQMX_LOG", default_value = "info")]
    pub log_level: String,

    #[arg(long)]
    pub log_json: bool,
}

impl Opts {
    pub fn self_id(&self) -> anyhow::Result<PeerId> {
        PeerId::new(self.peer_id.as_str())
    }

    pub fn build_config(&self) -> Config {
        let defaults = Config::default();
        Config {
            max_cs_hold: self.max_cs_hold.unwrap_or(defaults.max_cs_hold),
            heartbeat_interval: self.heartbeat_interval.unwrap_or(defaults.heartbeat_interval),
            heartbeat_timeout: self.heartbeat_timeout.unwrap_or(defaults.heartbeat_timeout),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            discovery_interval: self.discovery_interval.unwrap_or(defaults.discovery_interval),
            rpc_call_timeout: defaults.rpc_call_timeout,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        match (&self.directory, &self.static_peers) {
            (Some(_), Some(_)) => anyhow::bail!("--directory and --static-peers are mutually exclusive"),
            (None, None) => anyhow::bail!("one of --directory or --static-peers is required"),
            _ => Ok(()),
        }
    }
}
