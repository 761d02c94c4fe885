use tracing_subscriber::EnvFilter;

/// Builds an `EnvFilter` from `RQMX_LOG`/`RUST_LOG` (falling back to `info`) and installs a
/// global `fmt` subscriber, plain or JSON. Mirrors the teacher's `init_logging` shape, trimmed of
/// the webui broadcast-line plumbing this binary has no use for.
pub fn init_logging(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_env("RQMX_LOG")
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if json {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };
    if let Err(e) = result {
        eprintln!("logging already initialized: {e}");
    }
}
