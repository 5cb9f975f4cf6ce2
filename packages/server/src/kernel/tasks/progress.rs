//! Per-task progress accounting.
//!
//! Tracks processed/success/failed counts across one run, including counts
//! carried over from earlier runs of a resumed task, and derives the
//! percentage, terminal status, and summary message the engine persists.

use super::task::{ItemStatusCounts, TaskStatus};

#[derive(Debug, Clone, Copy)]
pub struct ProgressTracker {
    total: i64,
    processed: i64,
    success: i64,
    failed: i64,
}

impl ProgressTracker {
    /// Seed the tracker from the task's current item counts so a resumed
    /// task continues from where the previous run stopped.
    pub fn resume(counts: &ItemStatusCounts) -> Self {
        Self {
            total: counts.total,
            processed: counts.success + counts.failed,
            success: counts.success,
            failed: counts.failed,
        }
    }

    pub fn record_success(&mut self) {
        self.processed += 1;
        self.success += 1;
    }

    pub fn record_failure(&mut self) {
        self.processed += 1;
        self.failed += 1;
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn processed(&self) -> i32 {
        self.processed as i32
    }

    pub fn success(&self) -> i32 {
        self.success as i32
    }

    pub fn failed(&self) -> i32 {
        self.failed as i32
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.processed as f64 / self.total as f64 * 100.0
        }
    }

    /// Terminal status for a run that finished all its items: `failed` only
    /// when nothing succeeded, `partial_success` on a mix, `completed`
    /// otherwise.
    pub fn final_status(&self) -> TaskStatus {
        if self.failed > 0 && self.success == 0 {
            TaskStatus::Failed
        } else if self.failed > 0 {
            TaskStatus::PartialSuccess
        } else {
            TaskStatus::Completed
        }
    }

    pub fn summary(&self) -> String {
        match self.final_status() {
            TaskStatus::Failed => {
                format!("task failed: all {} processed items failed", self.processed)
            }
            TaskStatus::PartialSuccess => format!(
                "task partially succeeded: {} processed, {} succeeded, {} failed",
                self.processed, self.success, self.failed
            ),
            _ => format!(
                "task completed: {} processed, {} succeeded, {} failed",
                self.processed, self.success, self.failed
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(total: i64, success: i64, failed: i64) -> ItemStatusCounts {
        ItemStatusCounts {
            total,
            pending: total - success - failed,
            processing: 0,
            success,
            failed,
        }
    }

    #[test]
    fn fresh_task_starts_at_zero() {
        let tracker = ProgressTracker::resume(&counts(4, 0, 0));
        assert_eq!(tracker.processed(), 0);
        assert_eq!(tracker.percent(), 0.0);
    }

    #[test]
    fn resumed_task_carries_prior_counts() {
        let mut tracker = ProgressTracker::resume(&counts(4, 1, 1));
        assert_eq!(tracker.processed(), 2);
        assert_eq!(tracker.percent(), 50.0);

        tracker.record_success();
        tracker.record_success();
        assert_eq!(tracker.processed(), 4);
        assert_eq!(tracker.percent(), 100.0);
        assert_eq!(tracker.final_status(), TaskStatus::PartialSuccess);
    }

    #[test]
    fn all_failures_is_failed() {
        let mut tracker = ProgressTracker::resume(&counts(2, 0, 0));
        tracker.record_failure();
        tracker.record_failure();
        assert_eq!(tracker.final_status(), TaskStatus::Failed);
        assert!(tracker.summary().contains("all 2 processed items failed"));
    }

    #[test]
    fn all_successes_is_completed() {
        let mut tracker = ProgressTracker::resume(&counts(2, 0, 0));
        tracker.record_success();
        tracker.record_success();
        assert_eq!(tracker.final_status(), TaskStatus::Completed);
    }

    #[test]
    fn mix_is_partial_success() {
        let mut tracker = ProgressTracker::resume(&counts(2, 0, 0));
        tracker.record_success();
        tracker.record_failure();
        assert_eq!(tracker.final_status(), TaskStatus::PartialSuccess);
    }

    #[test]
    fn empty_task_completes_without_dividing_by_zero() {
        let tracker = ProgressTracker::resume(&counts(0, 0, 0));
        assert_eq!(tracker.percent(), 0.0);
        assert_eq!(tracker.final_status(), TaskStatus::Completed);
    }

    #[test]
    fn processed_never_exceeds_total_when_driven_by_item_list() {
        // The executor only feeds the tracker one call per fetched pending
        // item, so pending + prior processed == total keeps the invariant.
        let mut tracker = ProgressTracker::resume(&counts(3, 1, 0));
        tracker.record_success();
        tracker.record_failure();
        assert_eq!(tracker.processed() as i64, tracker.total());
    }
}
