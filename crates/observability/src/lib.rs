//! Tracing/logging setup shared by the binaries.

/// Subscriber installation.
pub mod tracing;

pub use crate::tracing::{LogFormat, LogSettings};

/// Initialize process-wide logging from the environment.
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init() {
    tracing::init(&LogSettings::from_env());
}
