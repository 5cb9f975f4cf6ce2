//! Task engine testing utilities.
//!
//! In-memory store and scripted processors used by the engine's own tests
//! and the integration suite.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::processor::TaskProcessor;
use super::store::TaskStore;
use super::task::{ItemStatusCounts, Task, TaskItem, TaskItemStatus, TaskStatus};

#[derive(Default)]
struct InMemoryState {
    tasks: HashMap<Uuid, Task>,
    /// Insertion order doubles as the stable item order.
    items: Vec<TaskItem>,
    /// Every `update_progress` call, for monotonicity assertions.
    progress_updates: Vec<ProgressUpdate>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    pub task_id: Uuid,
    pub progress: f64,
    pub processed: i32,
    pub success: i32,
    pub failed: i32,
}

/// In-memory `TaskStore` for tests.
#[derive(Default)]
pub struct InMemoryTaskStore {
    state: Mutex<InMemoryState>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_task(&self, task: Task) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.tasks.insert(task.id, task);
    }

    pub fn insert_item(&self, item: TaskItem) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.items.push(item);
    }

    pub fn task(&self, id: Uuid) -> Option<Task> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.tasks.get(&id).cloned()
    }

    pub fn items_for(&self, task_id: Uuid) -> Vec<TaskItem> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .items
            .iter()
            .filter(|i| i.task_id == task_id)
            .cloned()
            .collect()
    }

    pub fn progress_updates(&self, task_id: Uuid) -> Vec<ProgressUpdate> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .progress_updates
            .iter()
            .filter(|u| u.task_id == task_id)
            .copied()
            .collect()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn find_task(&self, id: Uuid) -> Result<Option<Task>> {
        Ok(self.task(id))
    }

    async fn tasks_by_status(&self, status: TaskStatus) -> Result<Vec<Task>> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| t.status == status)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| (t.created_at, t.id));
        Ok(tasks)
    }

    async fn update_status(&self, id: Uuid, status: TaskStatus) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = state.tasks.get_mut(&id) {
            task.status = status;
            task.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_status_message(
        &self,
        id: Uuid,
        status: TaskStatus,
        message: &str,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = state.tasks.get_mut(&id) {
            task.status = status;
            task.message = Some(message.to_string());
            task.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn mark_started(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = state.tasks.get_mut(&id) {
            task.started_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn mark_completed(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = state.tasks.get_mut(&id) {
            task.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn update_progress(
        &self,
        id: Uuid,
        progress: f64,
        processed: i32,
        success: i32,
        failed: i32,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = state.tasks.get_mut(&id) {
            task.progress = progress;
            task.processed_items = processed;
            task.success_items = success;
            task.failed_items = failed;
            task.updated_at = Utc::now();
        }
        state.progress_updates.push(ProgressUpdate {
            task_id: id,
            progress,
            processed,
            success,
            failed,
        });
        Ok(())
    }

    async fn items_by_status(
        &self,
        task_id: Uuid,
        status: TaskItemStatus,
    ) -> Result<Vec<TaskItem>> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state
            .items
            .iter()
            .filter(|i| i.task_id == task_id && i.status == status)
            .cloned()
            .collect())
    }

    async fn mark_item_processing(&self, item_id: Uuid) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(item) = state.items.iter_mut().find(|i| i.id == item_id) {
            item.status = TaskItemStatus::Processing;
        }
        Ok(())
    }

    async fn complete_item(&self, item_id: Uuid, output: serde_json::Value) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(item) = state.items.iter_mut().find(|i| i.id == item_id) {
            item.status = TaskItemStatus::Success;
            item.output = Some(output);
            item.error_message = None;
            item.processed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn fail_item(&self, item_id: Uuid, error: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(item) = state.items.iter_mut().find(|i| i.id == item_id) {
            item.status = TaskItemStatus::Failed;
            item.error_message = Some(error.to_string());
            item.processed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn reset_processing_items(&self, task_id: Uuid) -> Result<u64> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut reset = 0;
        for item in state
            .items
            .iter_mut()
            .filter(|i| i.task_id == task_id && i.status == TaskItemStatus::Processing)
        {
            item.status = TaskItemStatus::Pending;
            reset += 1;
        }
        Ok(reset)
    }

    async fn item_status_counts(&self, task_id: Uuid) -> Result<ItemStatusCounts> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut counts = ItemStatusCounts::default();
        for item in state.items.iter().filter(|i| i.task_id == task_id) {
            counts.total += 1;
            match item.status {
                TaskItemStatus::Pending => counts.pending += 1,
                TaskItemStatus::Processing => counts.processing += 1,
                TaskItemStatus::Success => counts.success += 1,
                TaskItemStatus::Failed => counts.failed += 1,
            }
        }
        Ok(counts)
    }
}

/// Scripted processor: succeeds with an echo payload unless the item's input
/// carries `{"fail": true}`, in which case it fails with the configured
/// error message. Records every processed item id.
pub struct StubProcessor {
    task_type: &'static str,
    error_message: String,
    processed: Mutex<Vec<Uuid>>,
}

impl StubProcessor {
    pub fn new(task_type: &'static str) -> Self {
        Self {
            task_type,
            error_message: "stubbed failure".to_string(),
            processed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    pub fn processed_items(&self) -> Vec<Uuid> {
        self.processed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl TaskProcessor for StubProcessor {
    fn task_type(&self) -> &'static str {
        self.task_type
    }

    async fn process(
        &self,
        _cancel: &CancellationToken,
        _task_id: Uuid,
        item: &mut TaskItem,
    ) -> Result<()> {
        self.processed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(item.id);

        if item.input.get("fail").and_then(|v| v.as_bool()) == Some(true) {
            bail!("{}", self.error_message);
        }

        item.output = Some(json!({ "echo": item.input }));
        Ok(())
    }
}

/// Processor that blocks each item on a semaphore permit and reports entries
/// over a channel, so tests can interleave pause/cancel deterministically
/// with the executor's between-item checks.
pub struct GatedProcessor {
    task_type: &'static str,
    entered: tokio::sync::mpsc::UnboundedSender<Uuid>,
    gate: Arc<Semaphore>,
}

impl GatedProcessor {
    pub fn new(
        task_type: &'static str,
    ) -> (
        Self,
        tokio::sync::mpsc::UnboundedReceiver<Uuid>,
        Arc<Semaphore>,
    ) {
        let (entered, entries) = tokio::sync::mpsc::unbounded_channel();
        let gate = Arc::new(Semaphore::new(0));
        (
            Self {
                task_type,
                entered,
                gate: gate.clone(),
            },
            entries,
            gate,
        )
    }
}

#[async_trait]
impl TaskProcessor for GatedProcessor {
    fn task_type(&self) -> &'static str {
        self.task_type
    }

    async fn process(
        &self,
        _cancel: &CancellationToken,
        _task_id: Uuid,
        item: &mut TaskItem,
    ) -> Result<()> {
        let _ = self.entered.send(item.id);
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| anyhow::anyhow!("gate closed"))?;
        permit.forget();

        item.output = Some(json!({ "gated": true }));
        Ok(())
    }
}
