//! Logging utilities

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system.
///
/// Honors `RUST_LOG`; falls back to `info` for this crate when unset. Safe to
/// call more than once.
pub fn init() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("scene_runtime=info"),
    )
    .try_init();
}

/// Initialize logging for tests, capturing output per test.
pub fn init_for_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
}
