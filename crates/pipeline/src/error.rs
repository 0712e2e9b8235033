//! Collaborator error taxonomy.
//!
//! Every failure the render, upload, and notify edges can produce is one of
//! these types; [`crate::retry::classify`] turns them into a disposition.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("render timed out after {0:?}")]
    Timeout(Duration),

    /// The page exists but has nothing for these parameters (unknown league
    /// or roster).
    #[error("render target not found: {0}")]
    NotFound(String),

    #[error("render failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("could not read artifact: {0}")]
    Artifact(String),

    #[error("storage rejected upload: {0}")]
    Remote(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifyError {
    /// Credentials, quota, or content refused by the transport. Retrying
    /// will not help and later sends will fail the same way.
    #[error("transport rejected message: {0}")]
    Rejected(String),

    #[error("transient transport failure: {0}")]
    Transient(String),
}

/// A failure tagged with the pipeline stage it came from.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StageError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

/// Checkpoint persistence error.
#[derive(Debug, Clone, Error)]
pub enum CheckpointError {
    #[error("checkpoint storage error: {0}")]
    Storage(String),

    #[error("checkpoint encoding error: {0}")]
    Encoding(String),
}
