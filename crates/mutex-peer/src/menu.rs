use std::sync::Arc;

use mutex_core::Peer;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

const USAGE: &str = "commands: REQUEST | RELEASE | LIST_PEERS | STATUS | QUIT";

/// Reads line-oriented commands from stdin (spec §6C) until `QUIT` or EOF, driving the peer's
/// public `RequestCS`/`ReleaseCS` API the same way a remote RPC or a test harness would.
pub async fn run(peer: Arc<Peer>, cancel: CancellationToken) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{USAGE}");
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = cancel.cancelled() => return Ok(()),
        };
        let Some(line) = line else {
            return Ok(());
        };
        match line.trim().to_ascii_uppercase().as_str() {
            "REQUEST" => match peer.request_cs().await {
                Ok(()) => println!("OK: entered critical section"),
                Err(e) => println!("ERROR: {e}"),
            },
            "RELEASE" => match peer.release_cs().await {
                Ok(()) => println!("OK: released"),
                Err(e) => println!("ERROR: {e}"),
            },
            "LIST_PEERS" => {
                for (id, endpoint, liveness) in peer.known_peers() {
                    println!("{id}\t{endpoint}\t{liveness:?}");
                }
            }
            "STATUS" => {
                let snap = peer.snapshot();
                println!(
                    "state={:?} generation={} ok_set={} pending={} deferred={}",
                    snap.state, snap.generation, snap.ok_set_len, snap.pending_len, snap.deferred_len
                );
            }
            "QUIT" => {
                cancel.cancel();
                return Ok(());
            }
            "" => {}
            _ => println!("{USAGE}"),
        }
    }
}
