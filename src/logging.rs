//! Logging setup.
//!
//! Diagnostics always go to stderr so that stdout carries only tool output.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Builds the filter from an optional directive string.
fn build_filter(directive: Option<&str>) -> EnvFilter {
    directive
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Initializes logging to stderr, filtered by `RUST_LOG`.
pub fn init_stderr_logging() {
    let directive = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(directive.as_deref()))
        .with_writer(std::io::stderr)
        .init();
}
