mod cli;
mod logging;
mod menu;

use std::sync::Arc;

use clap::Parser;
use cli::Opts;
use mutex_core::{Directory, Endpoint, Error, Peer};
use mutex_directory::{HttpDirectoryClient, StaticDirectoryClient};
use mutex_transport::{peer_router, HttpPeerRpcClient};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    opts.validate()?;
    logging::init_logging(&opts.log_level, opts.log_json);

    let self_id = opts.self_id()?;
    let config = Arc::new(opts.build_config());

    let listener = tokio::net::TcpListener::bind(opts.listen_addr)
        .await
        .map_err(|e| Error::Fatal(format!("failed to bind {}: {e}", opts.listen_addr)))?;
    let bound_addr = listener.local_addr()?;
    let listen_endpoint = Endpoint(bound_addr.to_string());
    println!("listening on {bound_addr}");
    tracing::info!(peer = %self_id, addr = %bound_addr, "starting");

    let transport = Arc::new(HttpPeerRpcClient::new(
        listen_endpoint.clone(),
        config.rpc_call_timeout,
    )?);
    let directory: Arc<dyn Directory> = match (&opts.directory, &opts.static_peers) {
        (Some(url), None) => Arc::new(HttpDirectoryClient::new(url.clone())),
        (None, Some(list)) => Arc::new(StaticDirectoryClient::parse(list)?),
        _ => unreachable!("validated above"),
    };

    let peer = Peer::new(self_id, listen_endpoint, config, transport, directory);

    let cancel = CancellationToken::new();
    let background = peer.spawn_background_tasks(cancel.clone());

    let app = peer_router(peer.clone());
    let server = tokio::spawn(
        axum::serve(listener, app).with_graceful_shutdown({
            let cancel = cancel.clone();
            async move { cancel.cancelled().await }
        }),
    );

    install_signal_handler(cancel.clone())?;

    menu::run(peer.clone(), cancel.clone()).await?;

    cancel.cancel();
    peer.unregister().await;
    for handle in background {
        let _ = handle.await;
    }
    let _ = server.await?;
    Ok(())
}

fn install_signal_handler(cancel: CancellationToken) -> anyhow::Result<()> {
    let mut signals = signal_hook::iterator::Signals::new([
        signal_hook::consts::SIGINT,
        signal_hook::consts::SIGTERM,
    ])?;
    std::thread::spawn(move || {
        if signals.forever().next().is_some() {
            tracing::info!("received shutdown signal");
            cancel.cancel();
        }
    });
    Ok(())
}
