//! Process-wide logging setup for the Lambda binaries.

use tracing_subscriber::EnvFilter;

/// JSON log lines on stdout for CloudWatch, filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_current_span(false)
        .without_time()
        .with_target(false)
        .try_init();
}
