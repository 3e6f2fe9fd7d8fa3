//! Logging setup
//!
//! `RUST_LOG` always wins. Without it the crate logs at `info`, raised to
//! `debug`/`trace` by repeating `-v`.

use tracing_subscriber::{fmt, EnvFilter};

/// Default filter directive for a verbosity count
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn,hidroanalise=info",
        1 => "warn,hidroanalise=debug",
        _ => "info,hidroanalise=trace",
    }
}

/// Initialize the global subscriber. Safe to call more than once; later
/// calls are ignored.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
