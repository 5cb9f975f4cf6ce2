//! Integration tests for the task engine lifecycle: terminal statuses,
//! crash recovery, cancellation, and task isolation.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use server_core::kernel::tasks::testing::{GatedProcessor, InMemoryTaskStore, StubProcessor};
use server_core::kernel::tasks::{
    TaskControlError, TaskItem, TaskItemStatus, TaskManager, TaskStatus,
};

use common::{seed_running_task, seed_task, wait_until_settled, wait_until_stopped};

fn engine() -> (Arc<InMemoryTaskStore>, TaskManager) {
    let store = Arc::new(InMemoryTaskStore::new());
    let manager = TaskManager::new(store.clone());
    (store, manager)
}

#[tokio::test]
async fn all_items_succeeding_completes_the_task() {
    let (store, manager) = engine();
    manager.register_processor(Arc::new(StubProcessor::new("echo")));

    let (task_id, _) = seed_task(
        &store,
        "echo",
        vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 3})],
    );

    manager.start_task(task_id).await.unwrap();
    wait_until_stopped(&manager, task_id).await;

    let task = store.task(task_id).unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.processed_items, 3);
    assert_eq!(task.success_items, 3);
    assert_eq!(task.failed_items, 0);
    assert_eq!(task.progress, 100.0);
    assert!(task.started_at.is_some());
    assert!(task.completed_at.is_some());
    assert!(task.message.unwrap().contains("3 processed"));

    for item in store.items_for(task_id) {
        assert_eq!(item.status, TaskItemStatus::Success);
        assert!(item.output.is_some());
        assert!(item.processed_at.is_some());
    }
}

#[tokio::test]
async fn all_items_failing_marks_the_task_failed() {
    let (store, manager) = engine();
    manager.register_processor(Arc::new(
        StubProcessor::new("echo").with_error_message("remote exploded"),
    ));

    let (task_id, _) = seed_task(
        &store,
        "echo",
        vec![json!({"fail": true}), json!({"fail": true})],
    );

    manager.start_task(task_id).await.unwrap();
    wait_until_stopped(&manager, task_id).await;

    let task = store.task(task_id).unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.failed_items, 2);
    assert_eq!(task.success_items, 0);

    for item in store.items_for(task_id) {
        assert_eq!(item.status, TaskItemStatus::Failed);
        assert_eq!(item.error_message.as_deref(), Some("remote exploded"));
    }
}

#[tokio::test]
async fn mixed_outcomes_are_partial_success_and_do_not_abort_the_task() {
    let (store, manager) = engine();
    manager.register_processor(Arc::new(
        StubProcessor::new("echo").with_error_message("account capacity exhausted"),
    ));

    let (task_id, item_ids) = seed_task(
        &store,
        "echo",
        vec![json!({"n": 1}), json!({"fail": true}), json!({"n": 3})],
    );

    manager.start_task(task_id).await.unwrap();
    wait_until_stopped(&manager, task_id).await;

    let task = store.task(task_id).unwrap();
    assert_eq!(task.status, TaskStatus::PartialSuccess);
    assert_eq!(task.processed_items, 3);
    assert_eq!(task.success_items, 2);
    assert_eq!(task.failed_items, 1);

    let items = store.items_for(task_id);
    assert_eq!(items[0].status, TaskItemStatus::Success);
    assert_eq!(items[1].status, TaskItemStatus::Failed);
    assert!(items[1].error_message.as_ref().unwrap().contains("capacity"));
    assert_eq!(items[2].status, TaskItemStatus::Success);
    assert_eq!(items[1].id, item_ids[1]);
}

#[tokio::test]
async fn starting_a_running_task_returns_already_running() {
    let (store, manager) = engine();
    let (processor, mut entries, gate) = GatedProcessor::new("gated");
    manager.register_processor(Arc::new(processor));

    let (task_id, _) = seed_task(&store, "gated", vec![json!({"n": 1})]);

    manager.start_task(task_id).await.unwrap();
    // The first item is inside the processor now, so the task is live.
    entries.recv().await.unwrap();

    let err = manager.start_task(task_id).await.unwrap_err();
    assert!(matches!(err, TaskControlError::AlreadyRunning(id) if id == task_id));

    gate.add_permits(10);
    wait_until_stopped(&manager, task_id).await;

    // Exactly one processor entry: no second executor ran.
    assert!(entries.try_recv().is_err());
    assert_eq!(store.task(task_id).unwrap().status, TaskStatus::Completed);
}

#[tokio::test]
async fn start_errors_for_missing_task_and_missing_processor() {
    let (store, manager) = engine();

    let err = manager.start_task(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, TaskControlError::NotFound(_)));

    let (task_id, _) = seed_task(&store, "unregistered", vec![json!({})]);
    let err = manager.start_task(task_id).await.unwrap_err();
    assert!(matches!(err, TaskControlError::NoProcessor(t) if t == "unregistered"));
    assert!(!manager.is_task_running(task_id));
}

#[tokio::test]
async fn pausing_reconciles_an_orphaned_running_row() {
    let (store, manager) = engine();

    // Row says running, but nothing in this process tracks it: the previous
    // process crashed. Pause must succeed by fixing the stale row.
    let task_id = seed_running_task(&store, "echo");
    manager.pause_task(task_id).await.unwrap();

    assert_eq!(store.task(task_id).unwrap().status, TaskStatus::Paused);
}

#[tokio::test]
async fn pausing_a_task_that_is_not_running_fails() {
    let (store, manager) = engine();
    let (task_id, _) = seed_task(&store, "echo", vec![]);

    let err = manager.pause_task(task_id).await.unwrap_err();
    assert!(matches!(err, TaskControlError::NotRunning(id) if id == task_id));
}

#[tokio::test]
async fn cancellation_is_observed_between_items_and_preserves_pending_work() {
    let (store, manager) = engine();
    let (processor, mut entries, gate) = GatedProcessor::new("gated");
    manager.register_processor(Arc::new(processor));

    let (task_id, item_ids) = seed_task(
        &store,
        "gated",
        vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 3})],
    );

    manager.start_task(task_id).await.unwrap();
    let first_entry = entries.recv().await.unwrap();
    assert_eq!(first_entry, item_ids[0]);

    // Pause while item 1 is mid-flight. The in-flight item runs to
    // completion; the loop notices the cancel before item 2.
    manager.pause_task(task_id).await.unwrap();
    gate.add_permits(10);

    // Item 1 finishes normally.
    for _ in 0..500 {
        let items = store.items_for(task_id);
        if items[0].status == TaskItemStatus::Success {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    let items = store.items_for(task_id);
    assert_eq!(items[0].status, TaskItemStatus::Success);
    assert_eq!(items[1].status, TaskItemStatus::Pending);
    assert_eq!(items[2].status, TaskItemStatus::Pending);
    assert_eq!(store.task(task_id).unwrap().status, TaskStatus::Paused);

    // The executor never entered item 2.
    assert!(entries.try_recv().is_err());
}

#[tokio::test]
async fn recovery_restarts_interrupted_tasks_and_resets_processing_items() {
    let (store, manager) = engine();
    let processor = Arc::new(StubProcessor::new("echo"));
    manager.register_processor(processor.clone());

    // Crash snapshot: task running, item 1 finished, item 2 was mid-flight,
    // item 3 untouched.
    let task_id = seed_running_task(&store, "echo");
    let done = TaskItem::builder()
        .task_id(task_id)
        .input(json!({"n": 1}))
        .status(TaskItemStatus::Success)
        .output(json!({"echo": {"n": 1}}))
        .build();
    let interrupted = TaskItem::builder()
        .task_id(task_id)
        .input(json!({"n": 2}))
        .status(TaskItemStatus::Processing)
        .build();
    let untouched = TaskItem::builder()
        .task_id(task_id)
        .input(json!({"n": 3}))
        .build();
    let interrupted_id = interrupted.id;
    store.insert_item(done);
    store.insert_item(interrupted);
    store.insert_item(untouched);

    let recovered = manager.recover_running_tasks().await.unwrap();
    assert_eq!(recovered, 1);
    wait_until_stopped(&manager, task_id).await;

    let task = store.task(task_id).unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.processed_items, 3);
    assert_eq!(task.success_items, 3);

    // The interrupted item was re-run from scratch, not left stuck.
    assert!(processor.processed_items().contains(&interrupted_id));
    for item in store.items_for(task_id) {
        assert_eq!(item.status, TaskItemStatus::Success);
    }
}

#[tokio::test]
async fn recovery_demotes_tasks_without_a_processor_to_pending() {
    let (store, manager) = engine();

    let task_id = seed_running_task(&store, "ghost");
    let recovered = manager.recover_running_tasks().await.unwrap();

    assert_eq!(recovered, 0);
    assert_eq!(store.task(task_id).unwrap().status, TaskStatus::Pending);
    assert!(!manager.is_task_running(task_id));
}

#[tokio::test]
async fn concurrent_tasks_of_different_types_stay_isolated() {
    let (store, manager) = engine();
    let alpha = Arc::new(StubProcessor::new("alpha"));
    let beta = Arc::new(StubProcessor::new("beta"));
    manager.register_processor(alpha.clone());
    manager.register_processor(beta.clone());

    let alpha_inputs: Vec<_> = (0..50).map(|n| json!({"n": n})).collect();
    let beta_inputs: Vec<_> = (0..30).map(|n| json!({"n": n})).collect();
    let (alpha_id, alpha_items) = seed_task(&store, "alpha", alpha_inputs);
    let (beta_id, beta_items) = seed_task(&store, "beta", beta_inputs);

    manager.start_task(alpha_id).await.unwrap();
    manager.start_task(beta_id).await.unwrap();
    wait_until_stopped(&manager, alpha_id).await;
    wait_until_stopped(&manager, beta_id).await;

    let alpha_task = store.task(alpha_id).unwrap();
    let beta_task = store.task(beta_id).unwrap();
    assert_eq!(alpha_task.status, TaskStatus::Completed);
    assert_eq!(beta_task.status, TaskStatus::Completed);
    assert_eq!(alpha_task.processed_items, 50);
    assert_eq!(beta_task.processed_items, 30);

    // Each processor saw exactly its own task's items, none crossed over.
    let alpha_seen = alpha.processed_items();
    let beta_seen = beta.processed_items();
    assert_eq!(alpha_seen.len(), 50);
    assert_eq!(beta_seen.len(), 30);
    assert!(alpha_items.iter().all(|id| alpha_seen.contains(id)));
    assert!(beta_items.iter().all(|id| beta_seen.contains(id)));
    assert!(alpha_seen.iter().all(|id| !beta_items.contains(id)));
    assert!(beta_seen.iter().all(|id| !alpha_items.contains(id)));
}

#[tokio::test]
async fn progress_is_monotonic_and_never_exceeds_total() {
    let (store, manager) = engine();
    manager.register_processor(Arc::new(StubProcessor::new("echo")));

    let inputs: Vec<_> = (0..5)
        .map(|n| {
            if n == 2 {
                json!({"fail": true})
            } else {
                json!({"n": n})
            }
        })
        .collect();
    let (task_id, _) = seed_task(&store, "echo", inputs);

    manager.start_task(task_id).await.unwrap();
    wait_until_stopped(&manager, task_id).await;

    let updates = store.progress_updates(task_id);
    assert_eq!(updates.len(), 5);

    let mut last_processed = 0;
    let mut last_percent = 0.0;
    for update in &updates {
        assert!(update.processed >= last_processed);
        assert!(update.progress >= last_percent);
        assert!(update.processed <= 5);
        assert!(update.progress <= 100.0);
        assert_eq!(update.processed, update.success + update.failed);
        last_processed = update.processed;
        last_percent = update.progress;
    }

    let last = updates.last().unwrap();
    assert_eq!(last.processed, 5);
    assert_eq!(last.progress, 100.0);
    assert_eq!(wait_until_settled(&store, task_id).await, TaskStatus::PartialSuccess);
}

#[tokio::test]
async fn empty_task_completes_immediately() {
    let (store, manager) = engine();
    manager.register_processor(Arc::new(StubProcessor::new("echo")));

    let (task_id, _) = seed_task(&store, "echo", vec![]);
    manager.start_task(task_id).await.unwrap();
    wait_until_stopped(&manager, task_id).await;

    let task = store.task(task_id).unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.processed_items, 0);
}
