//! Process-wide logging setup.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use crate::tracing::{LogFormat, init};
