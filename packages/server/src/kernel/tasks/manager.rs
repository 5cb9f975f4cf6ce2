//! Task lifecycle arbitration.
//!
//! The manager owns the set of currently running tasks and decides what
//! start/pause/stop/recover mean. Each started task gets a cancellable
//! token and its own tokio task running the executor loop; the executor
//! removes its entry from the running set when it exits. There is no cap on
//! how many tasks run at once; each one processes its items sequentially,
//! which bounds per-task load but not fleet-wide fan-out.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use super::executor;
use super::processor::{ProcessorRegistry, TaskProcessor};
use super::store::TaskStore;
use super::task::TaskStatus;

#[derive(Debug, Error)]
pub enum TaskControlError {
    #[error("task {0} is already running")]
    AlreadyRunning(Uuid),

    #[error("task {0} not found")]
    NotFound(Uuid),

    #[error("no processor registered for task type {0:?}")]
    NoProcessor(String),

    #[error("task {0} is not running")]
    NotRunning(Uuid),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

type RunningSet = Arc<Mutex<HashMap<Uuid, CancellationToken>>>;

pub struct TaskManager {
    store: Arc<dyn TaskStore>,
    processors: RwLock<ProcessorRegistry>,
    running: RunningSet,
}

impl TaskManager {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self {
            store,
            processors: RwLock::new(ProcessorRegistry::new()),
            running: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a processor under its task type. The last registration for a
    /// type wins.
    pub fn register_processor(&self, processor: Arc<dyn TaskProcessor>) {
        info!(task_type = processor.task_type(), "registering task processor");
        self.processors
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .register(processor);
    }

    /// Start a task's executor. Returns immediately; execution continues in
    /// the background until the task finishes or is paused/stopped.
    pub async fn start_task(&self, task_id: Uuid) -> Result<(), TaskControlError> {
        if self.is_task_running(task_id) {
            return Err(TaskControlError::AlreadyRunning(task_id));
        }

        let task = self
            .store
            .find_task(task_id)
            .await?
            .ok_or(TaskControlError::NotFound(task_id))?;

        let processor = self
            .processors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&task.task_type)
            .ok_or_else(|| TaskControlError::NoProcessor(task.task_type.clone()))?;

        let cancel = CancellationToken::new();
        {
            let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
            // Re-check under the lock: another caller may have raced us in
            // while we were loading the task row.
            if running.contains_key(&task_id) {
                return Err(TaskControlError::AlreadyRunning(task_id));
            }
            running.insert(task_id, cancel.clone());
        }

        self.spawn_executor(task, processor, cancel);
        info!(task_id = %task_id, "task started");
        Ok(())
    }

    /// Pause a running task: cancel its executor and persist `paused`.
    /// Remaining `pending` items are left untouched for a later resume.
    pub async fn pause_task(&self, task_id: Uuid) -> Result<(), TaskControlError> {
        self.suspend(task_id).await?;
        info!(task_id = %task_id, "task paused");
        Ok(())
    }

    /// Stop a running task. Identical to pause on the persistence side: the
    /// task lands in `paused` and can be started again later.
    pub async fn stop_task(&self, task_id: Uuid) -> Result<(), TaskControlError> {
        self.suspend(task_id).await?;
        info!(task_id = %task_id, "task stopped");
        Ok(())
    }

    async fn suspend(&self, task_id: Uuid) -> Result<(), TaskControlError> {
        let cancel = {
            let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
            running.remove(&task_id)
        };

        if let Some(cancel) = cancel {
            cancel.cancel();
            self.store.update_status(task_id, TaskStatus::Paused).await?;
            return Ok(());
        }

        // Not tracked in memory. A persisted `running` status then means the
        // process restarted while this task was live; reconcile the stale row
        // instead of failing the operator's request.
        let task = self
            .store
            .find_task(task_id)
            .await?
            .ok_or(TaskControlError::NotFound(task_id))?;

        if task.status == TaskStatus::Running {
            warn!(
                task_id = %task_id,
                "task marked running with no live executor; reconciling stale row to paused"
            );
            self.store.update_status(task_id, TaskStatus::Paused).await?;
            return Ok(());
        }

        Err(TaskControlError::NotRunning(task_id))
    }

    /// Restart tasks that were running when the process last stopped.
    ///
    /// Called once at startup. Tasks whose type no longer has a processor are
    /// demoted to `pending` so they are not stuck in `running` forever.
    pub async fn recover_running_tasks(&self) -> anyhow::Result<usize> {
        info!("recovering interrupted tasks");

        let tasks = self.store.tasks_by_status(TaskStatus::Running).await?;
        let mut recovered = 0;

        for task in tasks {
            if self.is_task_running(task.id) {
                continue;
            }

            let processor = self
                .processors
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .get(&task.task_type);

            let Some(processor) = processor else {
                warn!(
                    task_id = %task.id,
                    task_type = %task.task_type,
                    "no processor for interrupted task; demoting to pending"
                );
                if let Err(e) = self.store.update_status(task.id, TaskStatus::Pending).await {
                    warn!(task_id = %task.id, error = %e, "failed to demote interrupted task");
                }
                continue;
            };

            let cancel = CancellationToken::new();
            self.running
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(task.id, cancel.clone());

            info!(task_id = %task.id, task_type = %task.task_type, "recovering task");
            self.spawn_executor(task, processor, cancel);
            recovered += 1;
        }

        info!(count = recovered, "task recovery complete");
        Ok(recovered)
    }

    pub fn is_task_running(&self, task_id: Uuid) -> bool {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&task_id)
    }

    /// Ids of all currently tracked tasks (for shutdown sweeps).
    pub fn running_task_ids(&self) -> Vec<Uuid> {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .copied()
            .collect()
    }

    /// Persisted status of a task, regardless of whether it is tracked here.
    pub async fn task_status(&self, task_id: Uuid) -> Result<TaskStatus, TaskControlError> {
        let task = self
            .store
            .find_task(task_id)
            .await?
            .ok_or(TaskControlError::NotFound(task_id))?;
        Ok(task.status)
    }

    fn spawn_executor(
        &self,
        task: super::task::Task,
        processor: Arc<dyn TaskProcessor>,
        cancel: CancellationToken,
    ) {
        let store = self.store.clone();
        let running = self.running.clone();
        let task_id = task.id;

        tokio::spawn(async move {
            executor::run_task(store, processor, task, cancel).await;
            running
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&task_id);
        });
    }
}
