//! Shared scaffolding for the `tests/*.rs` integration suite: a
//! once-per-process `tracing` subscriber and the `.env`-sourced bootstrap
//! config the live-cluster scenarios skip themselves against when no
//! broker is reachable.

#![allow(dead_code)]

use once_cell::sync::OnceCell;

static LOGGING: OnceCell<()> = OnceCell::new();

/// Installs an `env-filter`-driven subscriber the first time it's called;
/// subsequent calls (e.g. from other tests in the same binary) are no-ops.
pub fn maybe_start_logging() {
    LOGGING.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug, Clone)]
pub struct TestConfig {
    pub bootstrap_brokers: Vec<String>,
}

impl TestConfig {
    pub fn from_env() -> Option<Self> {
        let _ = dotenvy::dotenv();
        let brokers = std::env::var("FLUVIO_CORE_TEST_BROKERS").ok()?;
        let bootstrap_brokers = brokers
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();
        if bootstrap_brokers.is_empty() {
            return None;
        }
        Some(Self { bootstrap_brokers })
    }
}

/// Returns a [`TestConfig`] built from `FLUVIO_CORE_TEST_BROKERS`
/// (comma-separated `host:port` list), or skips the calling test -- by
/// returning early with a printed reason -- when that variable is unset.
/// Every scenario in this directory needs a real cluster; there is no
/// broker implementation in this crate to test against in-process.
#[macro_export]
macro_rules! maybe_skip_kafka_integration {
    () => {
        match $crate::test_helpers::TestConfig::from_env() {
            Some(cfg) => cfg,
            None => {
                eprintln!(
                    "skipping integration test: set FLUVIO_CORE_TEST_BROKERS to a running cluster"
                );
                return;
            }
        }
    };
}
