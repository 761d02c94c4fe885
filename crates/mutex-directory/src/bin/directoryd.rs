//! Standalone registry service backing `HttpDirectoryClient`: an in-memory name -> endpoint map
//! with register/list/remove over HTTP. Deliberately thin — it is a naming service, not a
//! membership authority; liveness is still the peers' own job (spec §4.3, §6B).
use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use clap::Parser;
use dashmap::DashMap;
use mutex_core::Endpoint;
use mutex_directory::wire::{ListEntry, RegisterBody};

#[derive(Parser, Debug)]
#[command(name = "directoryd", about = "Naming-service registry for mutex-peer")]
struct Opts {
    #[arg(long, env = "RQMX_DIRECTORYD_LISTEN_ADDR", default_value = "127.0.0.1:7070")]
    listen_addr: SocketAddr,

    #[arg(short, long, env = "RQMX_LOG", default_value = "info")]
    log_level: String,
}

#[derive(Default)]
struct Registry {
    entries: DashMap<String, Endpoint>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&opts.log_level))
        .init();

    let registry = Arc::new(Registry::default());
    let app = Router::new()
        .route("/register", post(register))
        .route("/list", get(list))
        .route("/remove/{name}", delete(remove))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(registry);

    tracing::info!(addr = %opts.listen_addr, "directoryd listening");
    let listener = tokio::net::TcpListener::bind(opts.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutting down");
}

async fn register(State(registry): State<Arc<Registry>>, Json(body): Json<RegisterBody>) -> Json<()> {
    tracing::debug!(name = %body.name, endpoint = %body.endpoint, "register");
    registry.entries.insert(body.name, body.endpoint);
    Json(())
}

#[derive(serde::Deserialize)]
struct ListQuery {
    prefix: Option<String>,
}

async fn list(
    State(registry): State<Arc<Registry>>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<ListEntry>> {
    let prefix = query.prefix.unwrap_or_default();
    let entries = registry
        .entries
        .iter()
        .filter(|e| e.key().starts_with(&prefix))
        .map(|e| ListEntry {
            name: e.key().clone(),
            endpoint: e.value().clone(),
        })
        .collect();
    Json(entries)
}

async fn remove(State(registry): State<Arc<Registry>>, Path(name): Path<String>) -> Json<()> {
    tracing::debug!(name = %name, "remove");
    registry.entries.remove(&name);
    Json(())
}
