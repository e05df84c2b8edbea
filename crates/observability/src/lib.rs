//! Process-wide logging setup.

/// Initialize tracing for the process with the default filter (`info`).
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init() {
    tracing::init(tracing::DEFAULT_FILTER);
}

/// Subscriber configuration (filters, formats).
pub mod tracing;
