//! Task registry.
//!
//! The map is the only structure shared by concurrent callers; each record
//! carries its own lock, so the map lock is held only for insert, lookup
//! and removal, never while a record is inspected.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use taskwatch_core::{MonitorError, Result, SubagentTask, TaskId, TaskSnapshot};
use tokio::sync::RwLock;
use tracing::debug;

use crate::dispatcher::HookSender;
use crate::record::TaskRecord;

/// Mapping of task id to record.
#[derive(Default)]
pub(crate) struct Registry {
    records: RwLock<HashMap<TaskId, Arc<TaskRecord>>>,
    next_seq: AtomicU64,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Insert a new running record.
    ///
    /// A terminal record with the same id is replaced; a live one fails
    /// with [`MonitorError::DuplicateTaskId`].
    pub(crate) async fn create(
        &self,
        task_id: TaskId,
        task: &SubagentTask,
        timeout: Duration,
        hooks: HookSender,
    ) -> Result<Arc<TaskRecord>> {
        let mut records = self.records.write().await;

        if let Some(existing) = records.get(&task_id) {
            if !existing.status().await.is_terminal() {
                return Err(MonitorError::DuplicateTaskId(task_id));
            }
            debug!(task_id = %task_id, "replacing finished record");
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let record = Arc::new(TaskRecord::new(task_id.clone(), task, timeout, seq, hooks));
        records.insert(task_id, record.clone());
        Ok(record)
    }

    pub(crate) async fn get(&self, task_id: &TaskId) -> Option<Arc<TaskRecord>> {
        self.records.read().await.get(task_id).cloned()
    }

    /// Point-in-time snapshots ordered by spawn time.
    pub(crate) async fn list(&self) -> Vec<TaskSnapshot> {
        let mut records: Vec<Arc<TaskRecord>> = self.records.read().await.values().cloned().collect();
        records.sort_by_key(|r| r.order_key());

        let mut snapshots = Vec::with_capacity(records.len());
        for record in records {
            snapshots.push(record.snapshot().await);
        }
        snapshots
    }

    /// Remove a record if it is terminal. Returns whether one was removed.
    pub(crate) async fn remove_finished(&self, task_id: &TaskId) -> bool {
        let mut records = self.records.write().await;
        let Some(record) = records.get(task_id) else {
            return false;
        };
        if !record.status().await.is_terminal() {
            return false;
        }
        records.remove(task_id).is_some()
    }

    /// Remove every terminal record. Returns how many were removed.
    pub(crate) async fn prune_finished(&self) -> usize {
        let mut records = self.records.write().await;
        let mut finished = Vec::new();
        for (id, record) in records.iter() {
            if record.status().await.is_terminal() {
                finished.push(id.clone());
            }
        }
        for id in &finished {
            records.remove(id);
        }
        finished.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Termination;
    use taskwatch_core::TaskStatus;
    use tokio::sync::mpsc;

    fn hooks() -> HookSender {
        mpsc::unbounded_channel().0
    }

    async fn create(registry: &Registry, id: &str) -> Result<Arc<TaskRecord>> {
        registry
            .create(TaskId::from(id), &SubagentTask::new(id), Duration::from_secs(60), hooks())
            .await
    }

    #[tokio::test]
    async fn test_duplicate_live_id_is_rejected() {
        let registry = Registry::new();
        create(&registry, "a").await.unwrap();

        let err = create(&registry, "a").await.unwrap_err();
        assert!(matches!(err, MonitorError::DuplicateTaskId(id) if id.as_str() == "a"));
    }

    #[tokio::test]
    async fn test_finished_id_can_be_reused() {
        let registry = Registry::new();
        let first = create(&registry, "a").await.unwrap();
        first.finalize(Termination::Completed(serde_json::Value::Null)).await;

        let second = create(&registry, "a").await.unwrap();
        assert_eq!(second.status().await, TaskStatus::Running);
        assert_eq!(registry.list().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_is_ordered_by_spawn_time() {
        let registry = Registry::new();
        create(&registry, "late-name").await.unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        create(&registry, "b").await.unwrap();
        create(&registry, "a").await.unwrap();

        let ids: Vec<_> = registry.list().await.into_iter().map(|s| s.task_id.to_string()).collect();
        assert_eq!(ids, vec!["late-name", "b", "a"]);
    }

    #[tokio::test]
    async fn test_remove_only_finished_records() {
        let registry = Registry::new();
        let running = create(&registry, "run").await.unwrap();
        let done = create(&registry, "done").await.unwrap();
        done.finalize(Termination::Completed(serde_json::Value::Null)).await;

        assert!(!registry.remove_finished(running.task_id()).await);
        assert!(registry.remove_finished(done.task_id()).await);
        assert!(!registry.remove_finished(&TaskId::from("missing")).await);
        assert!(registry.get(running.task_id()).await.is_some());
        assert!(registry.get(done.task_id()).await.is_none());
    }

    #[tokio::test]
    async fn test_prune_finished() {
        let registry = Registry::new();
        create(&registry, "run").await.unwrap();
        for id in ["x", "y"] {
            let record = create(&registry, id).await.unwrap();
            record.finalize(Termination::Failed(MonitorError::Killed(TaskId::from(id)))).await;
        }

        assert_eq!(registry.prune_finished().await, 2);
        assert_eq!(registry.list().await.len(), 1);
    }
}
