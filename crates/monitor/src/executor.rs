//! Executor interface.
//!
//! The executor performs the actual subagent work. The monitor treats it
//! as the only source of truth for completion, failure and (optionally)
//! percentage complete.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use taskwatch_core::{ExecutorError, SubagentTask, TaskId};

/// Settings handed to the executor when a task starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartContext {
    /// Identifier the monitor tracks the task under
    pub task_id: TaskId,
    /// Timeout the monitor will enforce
    pub timeout: Duration,
}

/// Starts subagent executions.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Start executing a task and return a handle to it.
    async fn start(
        &self,
        task: &SubagentTask,
        context: &StartContext,
    ) -> Result<Arc<dyn ExecutionHandle>, ExecutorError>;
}

/// Handle to one running execution.
#[async_trait]
pub trait ExecutionHandle: Send + Sync {
    /// Latest percentage complete, or `None` when unavailable or unchanged.
    ///
    /// Out-of-range values are clamped by the monitor.
    fn poll_progress(&self) -> Option<i64> {
        None
    }

    /// Wait for the execution to finish. Called at most once.
    async fn await_result(&self) -> Result<serde_json::Value, ExecutorError>;

    /// Ask the execution to stop. May be called more than once.
    fn cancel(&self);
}
