//! Core error model.

use thiserror::Error;

/// Result type used across the core model.
pub type CoreResult<T> = Result<T, CoreError>;

/// Core-level error.
///
/// Keep this focused on deterministic failures of the pure model (bad
/// arguments, malformed rows). Collaborator and storage failures live in the
/// pipeline and infra crates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A caller passed an argument outside the accepted domain
    /// (e.g. a chunk index outside `1..=chunks`).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An input row could not be turned into a work item.
    #[error("malformed input: {0}")]
    MalformedInput(String),
}

impl CoreError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedInput(msg.into())
    }
}
