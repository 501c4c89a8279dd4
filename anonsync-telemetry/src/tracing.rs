//! Tracing subscriber setup for services and tests.

use std::error::Error;
use std::sync::Once;

use tracing::info;
use tracing_subscriber::EnvFilter;

/// Default filter directive when `RUST_LOG` is unset.
const DEFAULT_DIRECTIVES: &str = "info";

static TEST_TRACING: Once = Once::new();

/// Initializes the global tracing subscriber for a service binary.
///
/// The filter honors `RUST_LOG` and falls back to `info`. Fails if a global
/// subscriber was already installed.
pub fn init_tracing(service_name: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()?;

    info!(service_name, "tracing initialized");

    Ok(())
}

/// Initializes tracing for tests, once per process.
///
/// Output goes through the test writer so it is captured per test, and the
/// filter honors `RUST_LOG` for debugging noisy cases.
pub fn init_test_tracing() {
    TEST_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}
