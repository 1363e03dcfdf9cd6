//! Tracing setup shared by binaries and tests.

/// Initialize process-wide tracing: JSON lines, filtered by `RUST_LOG` (default `info`).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init_json();
}

/// Compact, human-readable output captured by the test harness.
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_for_tests() {
    tracing::init_test_writer();
}

/// Subscriber construction (filters, formatters).
pub mod tracing;
