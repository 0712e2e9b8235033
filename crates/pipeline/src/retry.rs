//! Retry policy and error classification.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{NotifyError, RenderError, StageError};

/// What the pipeline does with a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Start the item over from rendering, if attempts remain.
    Retry,
    /// Record the item as failed and move on.
    Fail,
    /// Nothing to deliver for this item; report it as skipped.
    Skip,
    /// Record the item as failed and stop the whole batch.
    AbortBatch,
}

/// Map a stage failure to the pipeline's reaction.
pub fn classify(error: &StageError) -> Disposition {
    match error {
        StageError::Render(RenderError::NotFound(_)) => Disposition::Skip,
        StageError::Render(RenderError::Timeout(_) | RenderError::Failed(_)) => Disposition::Retry,
        StageError::Upload(_) => Disposition::Retry,
        StageError::Notify(NotifyError::Transient(_)) => Disposition::Retry,
        StageError::Notify(NotifyError::Rejected(_)) => Disposition::AbortBatch,
    }
}

/// Backoff strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    #[default]
    Fixed,
    /// Exponential backoff: base * 2^(attempt - 1)
    Exponential,
    /// Linear backoff: base * attempt
    Linear,
}

/// Per-item retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per item, including the first one.
    pub max_attempts: u32,
    /// Base delay before a retry
    pub base_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
    pub strategy: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(2, Duration::from_millis(500))
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            max_delay: delay,
            strategy: BackoffStrategy::Fixed,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let delay = match self.strategy {
            BackoffStrategy::Fixed => self.base_delay,
            BackoffStrategy::Exponential => {
                let factor = 2u32.saturating_pow(attempt - 1);
                self.base_delay.saturating_mul(factor)
            }
            BackoffStrategy::Linear => self.base_delay.saturating_mul(attempt),
        };
        delay.min(self.max_delay)
    }

    /// Whether another attempt is allowed after `attempt` attempts were made.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UploadError;

    #[test]
    fn classification_table() {
        let cases = [
            (StageError::from(RenderError::Timeout(Duration::from_secs(60))), Disposition::Retry),
            (StageError::from(RenderError::Failed("boom".into())), Disposition::Retry),
            (StageError::from(RenderError::NotFound("league".into())), Disposition::Skip),
            (StageError::from(UploadError::Remote("500".into())), Disposition::Retry),
            (StageError::from(NotifyError::Transient("reset".into())), Disposition::Retry),
            (StageError::from(NotifyError::Rejected("quota".into())), Disposition::AbortBatch),
        ];
        for (error, expected) in cases {
            assert_eq!(classify(&error), expected, "{error}");
        }
    }

    #[test]
    fn default_policy_allows_two_attempts() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(1));
        assert!(!policy.should_retry(2));
    }

    #[test]
    fn exponential_backoff_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
            strategy: BackoffStrategy::Exponential,
        };
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(300));
        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
    }

    #[test]
    fn linear_backoff_increases_linearly() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
            strategy: BackoffStrategy::Linear,
        };
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(150));
    }
}
