//! `blueprint-pipeline`
//!
//! Resumable batch fan-out: each work item is rendered, uploaded, and
//! (optionally) announced to its recipient, one at a time, with bounded
//! retry and a write-through checkpoint.
//!
//! ## Components
//!
//! - `collab`: narrow traits for the render / upload / notify edges
//! - `retry`: retry policy and error classification
//! - `item`: the per-item state machine
//! - `checkpoint`: completed-work record and its store abstraction
//! - `driver`: iteration over the owned slice, skip handling, reporting

pub mod checkpoint;
pub mod collab;
pub mod driver;
pub mod error;
pub mod item;
pub mod retry;

pub use checkpoint::{Checkpoint, CheckpointEntry, CheckpointStore, InMemoryCheckpointStore};
pub use collab::{Notifier, RenderRequest, RenderedArtifact, Renderer, UploadedFile, Uploader};
pub use driver::{Abort, BatchDriver, RunReport, RunState, SkippedItem};
pub use error::{CheckpointError, NotifyError, RenderError, StageError, UploadError};
pub use item::{ItemOutcome, ItemPipeline, ItemState, SkipReason};
pub use retry::{BackoffStrategy, Disposition, RetryPolicy, classify};
