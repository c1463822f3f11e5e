//! Process-wide tracing/logging setup shared by the gatehouse binaries and tests.

pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize structured logging from the environment.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(LogFormat::from_env());
}

/// Human-readable logs routed through the test harness's captured output.
pub fn init_for_tests() {
    tracing::init_test();
}
