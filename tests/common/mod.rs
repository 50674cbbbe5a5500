//! Shared test setup. Installing a `tracing` subscriber here lets
//! `RUST_LOG=debug cargo test -- --nocapture` surface the registry/pool
//! debug events emitted by the storage core while a test runs.

use std::sync::Once;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
