//! Task and TaskItem models for background batch execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::common::id::db_id;

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    PartialSuccess,
    Cancelled,
}

impl TaskStatus {
    /// Terminal statuses never transition again; `paused` is deliberately
    /// not terminal so a paused task can re-enter `running`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed
                | TaskStatus::Failed
                | TaskStatus::PartialSuccess
                | TaskStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "task_item_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskItemStatus {
    #[default]
    Pending,
    Processing,
    Success,
    Failed,
}

// ============================================================================
// Models
// ============================================================================

/// One submitted background job composed of many items.
///
/// Rows are created by the submitting side with every item `pending`; from
/// then on only the task engine mutates them. The engine never deletes tasks.
#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Task {
    #[builder(default = db_id())]
    pub id: Uuid,

    /// Key into the processor registry.
    pub task_type: String,
    #[builder(default)]
    pub title: String,
    #[builder(default)]
    pub status: TaskStatus,

    // Aggregate item counts, maintained by the engine as items finish.
    #[builder(default = 0)]
    pub total_items: i32,
    #[builder(default = 0)]
    pub processed_items: i32,
    #[builder(default = 0)]
    pub success_items: i32,
    #[builder(default = 0)]
    pub failed_items: i32,
    /// `processed / total * 100`.
    #[builder(default = 0.0)]
    pub progress: f64,

    /// Human-readable outcome summary, set when the task reaches a terminal
    /// status.
    #[builder(default, setter(strip_option))]
    pub message: Option<String>,

    /// Free-form per-task configuration, interpreted by the processor.
    #[builder(default, setter(strip_option))]
    pub config: Option<serde_json::Value>,

    #[builder(default, setter(strip_option))]
    pub started_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub completed_at: Option<DateTime<Utc>>,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

/// One atomic unit of work within a task.
///
/// Owned by the single executor of its parent task; transitions
/// `pending -> processing -> {success|failed}` exactly once per attempt.
/// Only crash recovery forces `processing` back to `pending`.
#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct TaskItem {
    #[builder(default = db_id())]
    pub id: Uuid,
    pub task_id: Uuid,
    #[builder(default)]
    pub status: TaskItemStatus,

    /// Opaque payload interpreted by the processor.
    pub input: serde_json::Value,
    /// Result payload written by the processor before it returns Ok.
    #[builder(default, setter(strip_option))]
    pub output: Option<serde_json::Value>,
    /// Processor error, preserved verbatim for diagnosis.
    #[builder(default, setter(strip_option))]
    pub error_message: Option<String>,

    #[builder(default, setter(strip_option))]
    pub processed_at: Option<DateTime<Utc>>,
    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
}

/// Per-status item counts for one task.
#[derive(FromRow, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemStatusCounts {
    pub total: i64,
    pub pending: i64,
    pub processing: i64,
    pub success: i64,
    pub failed: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn terminal_statuses() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::PartialSuccess.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());

        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(!TaskStatus::Paused.is_terminal());
    }

    #[test]
    fn status_serializes_snake_case() {
        let encoded = serde_json::to_value(TaskStatus::PartialSuccess).unwrap();
        assert_eq!(encoded, json!("partial_success"));
    }

    #[test]
    fn builder_defaults() {
        let task = Task::builder().task_type("transfer").build();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.total_items, 0);
        assert!(task.message.is_none());

        let item = TaskItem::builder()
            .task_id(task.id)
            .input(json!({"url": "https://pan.xunlei.com/s/abc"}))
            .build();
        assert_eq!(item.status, TaskItemStatus::Pending);
        assert!(item.output.is_none());
    }
}
