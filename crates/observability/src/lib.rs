//! Process-wide tracing setup shared by the server binary and tests.

pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize tracing from the environment (`RUST_LOG`, `LOG_FORMAT`).
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(LogFormat::from_env());
}
