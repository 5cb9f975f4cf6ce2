//! Per-task execution loop.
//!
//! One executor runs per started task, on its own tokio task, and is the
//! single writer for that task's rows. Items are processed strictly
//! sequentially; cancellation is observed only between items, so an item
//! whose processor is mid-poll finishes (or times out) before the loop
//! notices the cancel. That granularity is intentional and matches the
//! manager's pause/stop contract.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::processor::TaskProcessor;
use super::progress::ProgressTracker;
use super::store::TaskStore;
use super::task::{Task, TaskItemStatus, TaskStatus};

/// Run one task to completion, cancellation, or fatal setup failure.
pub(crate) async fn run_task(
    store: Arc<dyn TaskStore>,
    processor: Arc<dyn TaskProcessor>,
    task: Task,
    cancel: CancellationToken,
) {
    let started = Instant::now();
    info!(task_id = %task.id, task_type = %task.task_type, "task execution starting");

    if let Err(e) = store.update_status(task.id, TaskStatus::Running).await {
        error!(task_id = %task.id, error = %e, "failed to mark task running");
        return;
    }
    if let Err(e) = store.mark_started(task.id).await {
        error!(task_id = %task.id, error = %e, "failed to record task start time");
    }

    let counts = match store.item_status_counts(task.id).await {
        Ok(counts) => counts,
        Err(e) => {
            error!(task_id = %task.id, error = %e, "failed to load item counts");
            Default::default()
        }
    };

    // Items stuck in `processing` can only come from a crashed run; their
    // work was never confirmed, so they must be redone from scratch.
    if counts.processing > 0 {
        info!(
            task_id = %task.id,
            count = counts.processing,
            "resetting interrupted items to pending"
        );
        if let Err(e) = store.reset_processing_items(task.id).await {
            error!(task_id = %task.id, error = %e, "failed to reset interrupted items");
        }
    }

    let items = match store.items_by_status(task.id, TaskItemStatus::Pending).await {
        Ok(items) => items,
        Err(e) => {
            error!(task_id = %task.id, error = %e, "failed to load pending items");
            mark_task_failed(&store, task.id, &format!("failed to load pending items: {e:#}"))
                .await;
            return;
        }
    };

    let mut progress = ProgressTracker::resume(&counts);
    debug!(
        task_id = %task.id,
        total = progress.total(),
        already_processed = progress.processed(),
        pending = items.len(),
        "item statistics loaded"
    );

    for item in items {
        if cancel.is_cancelled() {
            info!(
                task_id = %task.id,
                processed = progress.processed(),
                "task cancelled; remaining items stay pending for resume"
            );
            return;
        }

        let item_id = item.id;
        let item_started = Instant::now();

        match process_item(&store, &processor, task.id, item, &cancel).await {
            Ok(()) => {
                progress.record_success();
                info!(
                    task_id = %task.id,
                    item_id = %item_id,
                    elapsed_ms = item_started.elapsed().as_millis() as u64,
                    "item processed"
                );
            }
            Err(e) => {
                progress.record_failure();
                warn!(
                    task_id = %task.id,
                    item_id = %item_id,
                    error = %format!("{e:#}"),
                    elapsed_ms = item_started.elapsed().as_millis() as u64,
                    "item failed"
                );
            }
        }

        if progress.total() > 0 {
            if let Err(e) = store
                .update_progress(
                    task.id,
                    progress.percent(),
                    progress.processed(),
                    progress.success(),
                    progress.failed(),
                )
                .await
            {
                error!(task_id = %task.id, error = %e, "failed to persist progress");
            }
        }
    }

    let status = progress.final_status();
    let message = progress.summary();
    if let Err(e) = store.update_status_message(task.id, status, &message).await {
        error!(task_id = %task.id, error = %e, "failed to persist final task status");
    }
    if let Err(e) = store.mark_completed(task.id).await {
        error!(task_id = %task.id, error = %e, "failed to record task completion time");
    }

    info!(
        task_id = %task.id,
        status = ?status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        message = %message,
        "task finished"
    );
}

/// Process a single item: mark it processing, run the processor, persist the
/// outcome. The returned result only reports the item's fate; item failures
/// never abort the task.
async fn process_item(
    store: &Arc<dyn TaskStore>,
    processor: &Arc<dyn TaskProcessor>,
    task_id: Uuid,
    mut item: super::task::TaskItem,
    cancel: &CancellationToken,
) -> Result<()> {
    store
        .mark_item_processing(item.id)
        .await
        .context("failed to mark item processing")?;

    match processor.process(cancel, task_id, &mut item).await {
        Ok(()) => {
            let output = item
                .output
                .take()
                .unwrap_or_else(|| json!({ "success": true }));
            if let Err(e) = store.complete_item(item.id, output).await {
                error!(item_id = %item.id, error = %e, "failed to persist item success");
            }
            Ok(())
        }
        Err(e) => {
            // `{:#}` keeps the whole context chain so markers like the
            // provider's capacity message stay visible in the stored error.
            let verbatim = format!("{e:#}");
            if let Err(persist_err) = store.fail_item(item.id, &verbatim).await {
                error!(item_id = %item.id, error = %persist_err, "failed to persist item failure");
            }
            Err(e)
        }
    }
}

async fn mark_task_failed(store: &Arc<dyn TaskStore>, task_id: Uuid, message: &str) {
    if let Err(e) = store
        .update_status_message(task_id, TaskStatus::Failed, message)
        .await
    {
        error!(task_id = %task_id, error = %e, "failed to mark task failed");
    }
    if let Err(e) = store.mark_completed(task_id).await {
        error!(task_id = %task_id, error = %e, "failed to record task completion time");
    }
}
