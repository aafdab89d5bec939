//! Tracing subscriber setup.
//!
//! Logs always go to stderr: worker processes use stdout for replies.

use tracing_subscriber::EnvFilter;

/// Filter for a `-v` count when `RUST_LOG` is not set
pub fn filter_for_verbosity(verbose: u8) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    })
}

/// Install the global fmt subscriber; a second call is a no-op
pub fn init(verbose: u8) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_for_verbosity(verbose))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
