//! Batch driver: walks the owned slice of the work list one item at a time.
//!
//! - Items on the skip list, items already in the checkpoint, and items
//!   without identifiers are skipped and reported, never counted as failures.
//!   A checkpointed item that was never notified is processed again when the
//!   pipeline notifies.
//! - A failed item is recorded and the batch continues.
//! - A rejected transport stops the batch after recording the current item.
//! - The checkpoint is saved after every success.

use std::collections::HashSet;
use std::fmt;

use chrono::Utc;
use tracing::{error, info, warn};

use blueprint_core::{ChunkRange, RecipientKey, WorkItemStore};

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::error::{CheckpointError, StageError};
use crate::item::{ItemOutcome, ItemPipeline, SkipReason};

/// Mutable state of one run, owned by the driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    /// Absolute index into the work list to resume from.
    pub start_index: usize,
    /// Keys to bypass entirely.
    pub skip_set: HashSet<RecipientKey>,
    /// Keys that exhausted their attempts, in processing order.
    pub failures: Vec<RecipientKey>,
}

impl RunState {
    pub fn new(start_index: usize) -> Self {
        Self {
            start_index,
            ..Default::default()
        }
    }

    pub fn with_skip_set(mut self, keys: impl IntoIterator<Item = RecipientKey>) -> Self {
        self.skip_set.extend(keys);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    pub index: usize,
    pub key: RecipientKey,
    pub reason: SkipReason,
}

/// Where and why the batch stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abort {
    pub index: usize,
    pub key: RecipientKey,
    pub error: StageError,
}

/// Final accounting of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Slice of the work list this run owned.
    pub range: ChunkRange,
    /// Items that reached the renderer, including render `NotFound` skips.
    pub attempted: usize,
    pub succeeded: Vec<RecipientKey>,
    pub skipped: Vec<SkippedItem>,
    pub aborted: Option<Abort>,
    pub state: RunState,
}

impl RunReport {
    pub fn failed(&self) -> &[RecipientKey] {
        &self.state.failures
    }

    /// Index to pass as `start_index` to pick up where an aborted run
    /// stopped (the aborted item itself is retried).
    pub fn resume_index(&self) -> Option<usize> {
        self.aborted.as_ref().map(|a| a.index)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "range {}: attempted {}", self.range, self.attempted)?;
        writeln!(f, "succeeded: {}", self.succeeded.len())?;
        for key in &self.succeeded {
            writeln!(f, "  {key}")?;
        }
        writeln!(f, "failed: {}", self.state.failures.len())?;
        for key in &self.state.failures {
            writeln!(f, "  {key}")?;
        }
        writeln!(f, "skipped: {}", self.skipped.len())?;
        for skipped in &self.skipped {
            writeln!(f, "  #{} {} ({})", skipped.index, skipped.key, skipped.reason)?;
        }
        if let Some(abort) = &self.aborted {
            writeln!(
                f,
                "aborted at #{} {}: {} (resume with start index {})",
                abort.index, abort.key, abort.error, abort.index
            )?;
        }
        Ok(())
    }
}

/// Sequential driver over a [`WorkItemStore`].
pub struct BatchDriver<'a> {
    pipeline: &'a ItemPipeline,
    checkpoints: &'a dyn CheckpointStore,
}

impl<'a> BatchDriver<'a> {
    pub fn new(pipeline: &'a ItemPipeline, checkpoints: &'a dyn CheckpointStore) -> Self {
        Self { pipeline, checkpoints }
    }

    /// Process `store[max(start_index, range.start) .. range.end]`.
    ///
    /// Item failures never surface as `Err`; only a checkpoint that cannot be
    /// read or written ends the run with an error.
    pub fn run(
        &self,
        store: &mut WorkItemStore,
        range: ChunkRange,
        mut state: RunState,
    ) -> Result<RunReport, CheckpointError> {
        let mut checkpoint: Checkpoint = self.checkpoints.load()?;
        let end = range.end.min(store.len());
        let begin = state.start_index.max(range.start);

        info!(
            %range,
            begin,
            end,
            total = store.len(),
            completed = checkpoint.len(),
            notify = self.pipeline.notifies(),
            "starting batch"
        );

        let mut attempted = 0;
        let mut succeeded = Vec::new();
        let mut skipped = Vec::new();
        let mut aborted = None;

        for index in begin..end {
            let Some(item) = store.get_mut(index) else {
                break;
            };
            let key = item.key().clone();

            let pre_skip = if state.skip_set.contains(&key) {
                Some(SkipReason::Listed)
            } else if let Some(entry) = checkpoint.get(&key) {
                if entry.notified || !self.pipeline.notifies() {
                    Some(SkipReason::AlreadyCompleted)
                } else {
                    info!(index, key = %key.censored(), "delivered without notification; processing again");
                    None
                }
            } else {
                None
            };
            if let Some(reason) = pre_skip {
                info!(index, key = %key.censored(), %reason, "skipping item");
                item.mark_skipped();
                skipped.push(SkippedItem { index, key, reason });
                continue;
            }

            info!(index, position = index + 1, end, key = %key.censored(), "processing item");

            match self.pipeline.execute(item) {
                ItemOutcome::Skipped(reason) => {
                    if matches!(reason, SkipReason::NotFound(_)) {
                        attempted += 1;
                    }
                    info!(index, key = %key.censored(), %reason, "skipping item");
                    skipped.push(SkippedItem { index, key, reason });
                }
                ItemOutcome::Succeeded(result) => {
                    attempted += 1;
                    checkpoint.record(item, Utc::now());
                    self.checkpoints.save(&checkpoint)?;
                    info!(
                        index,
                        key = %key.censored(),
                        buys = %result.buys,
                        notified = result.notified,
                        "item delivered"
                    );
                    succeeded.push(key);
                }
                ItemOutcome::Failed { error, attempts } => {
                    attempted += 1;
                    warn!(index, key = %key.censored(), attempts, %error, "item failed");
                    state.failures.push(key);
                }
                ItemOutcome::Aborted { error, attempts } => {
                    attempted += 1;
                    error!(index, key = %key.censored(), attempts, %error, "transport rejected; stopping batch");
                    state.failures.push(key.clone());
                    aborted = Some(Abort { index, key, error });
                    break;
                }
            }
        }

        let report = RunReport {
            range,
            attempted,
            succeeded,
            skipped,
            aborted,
            state,
        };
        info!(
            attempted = report.attempted,
            succeeded = report.succeeded.len(),
            failed = report.state.failures.len(),
            skipped = report.skipped.len(),
            aborted = report.aborted.is_some(),
            "batch finished"
        );
        Ok(report)
    }
}
