//! Shared CLI bootstrap for the `ukeypair`/`ulocalcommand` binaries.

/// Installs a `tracing-subscriber` fmt layer honoring `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}
