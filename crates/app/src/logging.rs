//! Tracing subscriber setup for the binary.

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "warn,services=info,storage=info";

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` overrides the default filter. Calling this twice is harmless;
/// the second subscriber is ignored.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
