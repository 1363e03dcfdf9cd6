//! Subscriber construction.
//!
//! The filter is read from `RUST_LOG`; spans such as `cash_flow_run` carry the
//! asset id, so per-asset runs can be told apart in JSON output.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// JSON logs + timestamps, configurable via RUST_LOG.
pub fn init_json() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .json()
        .with_current_span(true)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}

pub fn init_test_writer() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .compact()
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialization_is_a_no_op() {
        init_test_writer();
        init_test_writer();
        init_json();
    }
}
