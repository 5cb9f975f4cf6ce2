//! Shared helpers for the engine integration tests.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use uuid::Uuid;

use server_core::kernel::tasks::testing::InMemoryTaskStore;
use server_core::kernel::tasks::{Task, TaskItem, TaskManager, TaskStatus};

/// Insert a task plus its items and return their ids in insertion order.
pub fn seed_task(
    store: &Arc<InMemoryTaskStore>,
    task_type: &str,
    inputs: Vec<Value>,
) -> (Uuid, Vec<Uuid>) {
    let task = Task::builder().task_type(task_type).build();
    let task_id = task.id;
    store.insert_task(task);

    let mut item_ids = Vec::new();
    for input in inputs {
        let item = TaskItem::builder().task_id(task_id).input(input).build();
        item_ids.push(item.id);
        store.insert_item(item);
    }

    (task_id, item_ids)
}

/// Insert a task that claims to be running already (as a crashed process
/// would have left it).
pub fn seed_running_task(
    store: &Arc<InMemoryTaskStore>,
    task_type: &str,
) -> Uuid {
    let task = Task::builder()
        .task_type(task_type)
        .status(TaskStatus::Running)
        .build();
    let task_id = task.id;
    store.insert_task(task);
    task_id
}

/// Wait until the manager no longer tracks the task.
pub async fn wait_until_stopped(manager: &TaskManager, task_id: Uuid) {
    for _ in 0..500 {
        if !manager.is_task_running(task_id) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {task_id} did not stop in time");
}

/// Wait until the task's persisted status becomes terminal or paused.
pub async fn wait_until_settled(store: &Arc<InMemoryTaskStore>, task_id: Uuid) -> TaskStatus {
    for _ in 0..500 {
        if let Some(task) = store.task(task_id) {
            if task.status.is_terminal() || task.status == TaskStatus::Paused {
                return task.status;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {task_id} never settled");
}
