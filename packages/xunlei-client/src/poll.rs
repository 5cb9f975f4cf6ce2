//! Bounded polling for asynchronous provider-side jobs.
//!
//! Restore, share and delete operations return a task id instead of a final
//! result; the caller has to keep asking the task endpoint until the job
//! reaches a terminal state. The loop here is attempt-bounded, not
//! wall-clock-bounded, so its worst case scales with the configured interval.

use std::future::Future;
use std::time::Duration;

use crate::error::{Result, XunleiError};

/// Poll cadence and budget for one remote task.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between consecutive status checks.
    pub interval: Duration,
    /// Maximum number of status checks before giving up with
    /// [`XunleiError::TaskTimeout`].
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 50,
        }
    }
}

/// Outcome of a single status check.
#[derive(Debug)]
pub enum PollState<T> {
    InProgress,
    Done(T),
}

/// Drive `check` until it reports `Done`, an error, or the attempt budget is
/// exhausted. The attempt index (0-based) is passed through to `check` so
/// callers can forward it as the provider's `retry_index` parameter. Errors
/// from `check` abort immediately without consuming the remaining budget.
pub async fn poll_until_complete<T, F, Fut>(config: &PollConfig, mut check: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PollState<T>>>,
{
    for attempt in 0..config.max_attempts {
        match check(attempt).await? {
            PollState::Done(value) => return Ok(value),
            PollState::InProgress => tokio::time::sleep(config.interval).await,
        }
    }

    Err(XunleiError::TaskTimeout {
        attempts: config.max_attempts,
    })
}
