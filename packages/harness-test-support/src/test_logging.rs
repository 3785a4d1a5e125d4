//! Tracing output for integration test binaries.
//!
//! Each binary installs the subscriber from a `#[ctor::ctor]` hook in its
//! support module; later calls are no-ops.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when neither variable is set.
pub const DEFAULT_FILTER: &str = "warn";

static SUBSCRIBER: OnceCell<()> = OnceCell::new();

/// Filter directives for tests: `TEST_LOG` wins over `RUST_LOG`, otherwise
/// [`DEFAULT_FILTER`].
///
/// Verbose query lines use the `txn_harness::query` target at `info`, so
/// `TEST_LOG=txn_harness::query=info` shows just those.
pub fn filter_directives() -> String {
    ["TEST_LOG", "RUST_LOG"]
        .into_iter()
        .find_map(|name| std::env::var(name).ok())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Install the test subscriber once per process.
pub fn init() {
    SUBSCRIBER.get_or_init(|| {
        // Another subscriber may already own the global slot.
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directives()))
            .with_test_writer()
            .without_time()
            .try_init();
    });
}
