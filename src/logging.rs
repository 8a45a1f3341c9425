//! Tracing subscriber setup for the command line driver.
//!
//! The filter comes from `TSDGEN_LOG`, then `RUST_LOG`, and defaults to
//! `warn` so generator diagnostics are always visible. Debug mode (the
//! `--debug` flag or `TSDGEN_DEBUG=1`) forces the `debug` level.

use tracing_subscriber::EnvFilter;

/// Build the filter for the given debug setting.
fn build_filter(debug: bool) -> EnvFilter {
    if debug {
        return EnvFilter::new("debug");
    }
    if let Ok(value) = std::env::var("TSDGEN_LOG") {
        EnvFilter::builder().parse_lossy(value)
    } else if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new("warn")
    }
}

/// Whether debug output was requested through the environment.
pub fn debug_from_env() -> bool {
    std::env::var("TSDGEN_DEBUG").is_ok_and(|value| value == "1" || value == "true")
}

/// Initialise the global tracing subscriber.
///
/// Diagnostics are written to stdout; they describe the generated output
/// and do not decide whether the run failed.
pub fn init_tracing(debug: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(debug))
        .with_writer(std::io::stdout)
        .with_target(debug)
        .try_init();
}
