//! Subscriber setup shared by the exercise binaries.

use tracing_subscriber::EnvFilter;

/// Installs a compact stderr subscriber. `RUST_LOG` wins over `level`.
///
/// Calling it twice is harmless: the second subscriber is dropped.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
