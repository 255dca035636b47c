//! Logging initialisation.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Build the filter: explicit directives, then `RUST_LOG`, then `info`.
pub fn env_filter(directives: Option<&str>) -> EnvFilter {
    match directives {
        Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|err| {
            eprintln!("invalid log filter {directives:?}: {err}; using {DEFAULT_FILTER}");
            EnvFilter::new(DEFAULT_FILTER)
        }),
        None => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
        }
    }
}

/// Install the global `fmt` subscriber.
///
/// Does nothing if a subscriber is already installed, so tests and embedding
/// programs may install their own first.
pub fn init(directives: Option<&str>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(directives))
        .with_target(true)
        .with_level(true)
        .try_init();
}
