//! Shared `tracing-subscriber` bootstrap for every UMPS binary.

use tracing_subscriber::EnvFilter;

/// Installs a global subscriber reading `RUST_LOG` (defaulting to `info`). Call once, from
/// `main`, before spawning any actor.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
