pub mod builders;
pub mod fakes;

use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Every async test runs under this deadline; a pipeline that takes longer
/// than this in a test is stuck, not slow.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Initialise tracing for tests. Safe to call from every test; only the
/// first call installs the subscriber.
///
/// Output goes through `with_test_writer()`, so the harness only prints it
/// for failing tests (unless `-- --nocapture`). Raise levels per run with
/// e.g. `RUST_LOG=conveyor=debug cargo test`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await a future, panicking if it outlives [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, f)
        .await
        .expect("test exceeded the timeout; a task group or watch loop is stuck")
}
