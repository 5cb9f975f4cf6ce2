//! Processor contract and registry.
//!
//! A processor knows how to execute the items of one task type. The registry
//! maps task-type strings to processors so the manager can dispatch a claimed
//! task without knowing the concrete type.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::task::TaskItem;

/// Handler for one task type.
///
/// Contract: on success the processor must have written its result payload
/// into `item.output` before returning Ok; on error it returns a descriptive
/// error, which the engine persists verbatim on the item.
///
/// Items found `processing` after a crash are re-run from scratch, so
/// `process` must be safe to invoke again with the same input (check for an
/// already-existing artifact and short-circuit instead of redoing the work).
#[async_trait]
pub trait TaskProcessor: Send + Sync {
    /// Registry key for this processor.
    fn task_type(&self) -> &'static str;

    async fn process(
        &self,
        cancel: &CancellationToken,
        task_id: Uuid,
        item: &mut TaskItem,
    ) -> Result<()>;
}

/// Registry mapping task-type strings to processors.
///
/// The last registration for a given type wins.
#[derive(Default)]
pub struct ProcessorRegistry {
    processors: HashMap<&'static str, Arc<dyn TaskProcessor>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self {
            processors: HashMap::new(),
        }
    }

    pub fn register(&mut self, processor: Arc<dyn TaskProcessor>) {
        self.processors.insert(processor.task_type(), processor);
    }

    pub fn get(&self, task_type: &str) -> Option<Arc<dyn TaskProcessor>> {
        self.processors.get(task_type).cloned()
    }

    pub fn is_registered(&self, task_type: &str) -> bool {
        self.processors.contains_key(task_type)
    }

    pub fn registered_types(&self) -> Vec<&'static str> {
        self.processors.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct NoopProcessor {
        task_type: &'static str,
        marker: &'static str,
    }

    #[async_trait]
    impl TaskProcessor for NoopProcessor {
        fn task_type(&self) -> &'static str {
            self.task_type
        }

        async fn process(
            &self,
            _cancel: &CancellationToken,
            _task_id: Uuid,
            item: &mut TaskItem,
        ) -> Result<()> {
            item.output = Some(json!({ "marker": self.marker }));
            Ok(())
        }
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = ProcessorRegistry::new();
        registry.register(Arc::new(NoopProcessor {
            task_type: "transfer",
            marker: "a",
        }));

        assert!(registry.is_registered("transfer"));
        assert!(!registry.is_registered("unknown"));
        assert!(registry.get("transfer").is_some());
        assert_eq!(registry.registered_types(), vec!["transfer"]);
    }

    #[tokio::test]
    async fn last_registration_wins() {
        let mut registry = ProcessorRegistry::new();
        registry.register(Arc::new(NoopProcessor {
            task_type: "transfer",
            marker: "first",
        }));
        registry.register(Arc::new(NoopProcessor {
            task_type: "transfer",
            marker: "second",
        }));

        let processor = registry.get("transfer").unwrap();
        let mut item = TaskItem::builder()
            .task_id(Uuid::new_v4())
            .input(json!({}))
            .build();
        processor
            .process(&CancellationToken::new(), Uuid::new_v4(), &mut item)
            .await
            .unwrap();

        assert_eq!(item.output, Some(json!({ "marker": "second" })));
    }
}
