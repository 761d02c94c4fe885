use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Spawns `fut` under `span`, logging completion/cancellation/error. Adapted from the task-spawn
/// helper rqbit's torrent manager uses for its background loops: every long-running peer task
/// (heartbeat sender, liveness checker, request sweeper, discovery poller, lease timer) goes
/// through here instead of a bare `tokio::spawn`, so a silently-dying task shows up in the logs.
pub fn spawn(
    span: tracing::Span,
    fut: impl Future<Output = anyhow::Result<()>> + Send + 'static,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(
        async move {
            match fut.await {
                Ok(()) => tracing::debug!("finished"),
                Err(e) => tracing::error!(error=?e, "task errored"),
            }
        }
        .instrument(span),
    )
}

/// As `spawn`, but the future is raced against `cancellation_token` so shutdown doesn't have to
/// wait for the task's own polling interval to elapse.
pub fn spawn_with_cancel(
    span: tracing::Span,
    cancellation_token: CancellationToken,
    fut: impl Future<Output = anyhow::Result<()>> + Send + 'static,
) -> tokio::task::JoinHandle<()> {
    let inner_span = span.clone();
    spawn(span, async move {
        tokio::select! {
            res = fut => res,
            _ = cancellation_token.cancelled() => {
                tracing::debug!(parent: &inner_span, "cancelled");
                Ok(())
            }
        }
    })
}
