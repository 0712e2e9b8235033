//! Per-item execution: render → upload → notify with bounded retry.
//!
//! ```text
//! Pending -> Rendering -> Uploading -> Notifying -> Succeeded
//!                 \            \            \
//!                  +------------+------------+--> Failed | Skipped
//! ```
//!
//! A retry restarts the item from `Rendering`. An item is only marked
//! `Succeeded` after notification completed, so a resumed run re-attempts
//! anything that was not fully delivered.

use std::fmt;
use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};

use blueprint_core::{RecipientKey, RenderedResult, WorkItem};

use crate::collab::{Notifier, RenderRequest, Renderer, Uploader};
use crate::error::StageError;
use crate::retry::{Disposition, RetryPolicy, classify};

/// Fine-grained state of an item while it is being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Pending,
    Rendering,
    Uploading,
    Notifying,
    Succeeded,
    Failed,
    Skipped,
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemState::Pending => "pending",
            ItemState::Rendering => "rendering",
            ItemState::Uploading => "uploading",
            ItemState::Notifying => "notifying",
            ItemState::Succeeded => "succeeded",
            ItemState::Failed => "failed",
            ItemState::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Why an item was not attempted (or not delivered).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Key is on the configured skip list.
    Listed,
    /// No league id, or neither a team nor a user id.
    MissingIdentifiers,
    /// Already present in the checkpoint from an earlier run.
    AlreadyCompleted,
    /// The render target does not exist for these parameters.
    NotFound(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Listed => f.write_str("on skip list"),
            SkipReason::MissingIdentifiers => f.write_str("no team or user id"),
            SkipReason::AlreadyCompleted => f.write_str("already completed"),
            SkipReason::NotFound(detail) => write!(f, "nothing to render: {detail}"),
        }
    }
}

/// How an item ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Succeeded(RenderedResult),
    Skipped(SkipReason),
    /// Attempts exhausted or a non-retryable failure; the batch continues.
    Failed { error: StageError, attempts: u32 },
    /// The item failed in a way that makes the rest of the batch pointless.
    Aborted { error: StageError, attempts: u32 },
}

/// Tracks and logs state transitions of one attempt.
struct Transitions<'a> {
    key: &'a RecipientKey,
    attempt: u32,
    state: ItemState,
}

impl<'a> Transitions<'a> {
    fn new(key: &'a RecipientKey, attempt: u32) -> Self {
        Self {
            key,
            attempt,
            state: ItemState::Pending,
        }
    }

    fn enter(&mut self, next: ItemState) {
        debug!(
            key = %self.key.censored(),
            attempt = self.attempt,
            from = %self.state,
            to = %next,
            "item transition"
        );
        self.state = next;
    }
}

/// Executes one item at a time against the external collaborators.
pub struct ItemPipeline {
    renderer: Arc<dyn Renderer>,
    uploader: Arc<dyn Uploader>,
    notifier: Option<Arc<dyn Notifier>>,
    policy: RetryPolicy,
    folder: String,
}

impl ItemPipeline {
    /// Pipeline that renders and uploads but does not notify.
    pub fn new(renderer: Arc<dyn Renderer>, uploader: Arc<dyn Uploader>, folder: impl Into<String>) -> Self {
        Self {
            renderer,
            uploader,
            notifier: None,
            policy: RetryPolicy::default(),
            folder: folder.into(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn notifies(&self) -> bool {
        self.notifier.is_some()
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// Run `item` to a terminal state.
    ///
    /// Never returns an error: every failure becomes an [`ItemOutcome`] and
    /// the item's status is updated to match.
    pub fn execute(&self, item: &mut WorkItem) -> ItemOutcome {
        let Some(params) = item.params().render_query() else {
            item.mark_skipped();
            return ItemOutcome::Skipped(SkipReason::MissingIdentifiers);
        };
        let request = RenderRequest {
            key: item.key().clone(),
            params,
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut transitions = Transitions::new(&request.key, attempt);

            let error = match self.attempt(&request, &mut transitions) {
                Ok(result) => {
                    transitions.enter(ItemState::Succeeded);
                    item.mark_succeeded(result.clone());
                    return ItemOutcome::Succeeded(result);
                }
                Err(error) => error,
            };

            match classify(&error) {
                Disposition::Retry if self.policy.should_retry(attempt) => {
                    let delay = self.policy.delay_for_attempt(attempt);
                    warn!(
                        key = %request.key.censored(),
                        attempt,
                        stage = %transitions.state,
                        error = %error,
                        delay_ms = delay.as_millis() as u64,
                        "item attempt failed; retrying"
                    );
                    thread::sleep(delay);
                }
                Disposition::Skip => {
                    transitions.enter(ItemState::Skipped);
                    info!(key = %request.key.censored(), error = %error, "nothing to render; skipping");
                    item.mark_skipped();
                    return ItemOutcome::Skipped(SkipReason::NotFound(error.to_string()));
                }
                Disposition::AbortBatch => {
                    transitions.enter(ItemState::Failed);
                    item.mark_failed();
                    return ItemOutcome::Aborted { error, attempts: attempt };
                }
                Disposition::Retry | Disposition::Fail => {
                    transitions.enter(ItemState::Failed);
                    item.mark_failed();
                    return ItemOutcome::Failed { error, attempts: attempt };
                }
            }
        }
    }

    fn attempt(&self, request: &RenderRequest, transitions: &mut Transitions<'_>) -> Result<RenderedResult, StageError> {
        transitions.enter(ItemState::Rendering);
        // Dropping the artifact releases the downloaded file on every path.
        let artifact = self.renderer.render(request)?;

        transitions.enter(ItemState::Uploading);
        let destination = format!("{}/{}", self.folder, artifact.name());
        let uploaded = self.uploader.upload(&artifact, &destination)?;

        let notified = match &self.notifier {
            Some(notifier) => {
                transitions.enter(ItemState::Notifying);
                let link = uploaded.link.as_deref().unwrap_or(&uploaded.id);
                notifier.notify(&request.key, link)?;
                true
            }
            None => false,
        };

        Ok(RenderedResult {
            buys: artifact.buys().to_string(),
            file_id: uploaded.id,
            link: uploaded.link,
            notified,
        })
    }
}
