//! Tracing/logging setup shared by every binary.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use tracing::{LogFormat, ParseLogFormatError};

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init(format: LogFormat) {
    tracing::init(format);
}
