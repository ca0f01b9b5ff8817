//! Simulated subagent executor for demonstrations.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use taskwatch_core::{ExecutorError, SubagentTask};
use taskwatch_monitor::{ExecutionHandle, Executor, StartContext};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Executor that "works" for a fixed duration.
#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    /// How long each execution takes
    pub duration: Duration,
    /// Fail instead of returning a result
    pub fail: bool,
    /// Never report a percentage
    pub silent: bool,
}

#[async_trait]
impl Executor for SimulatedExecutor {
    async fn start(
        &self,
        task: &SubagentTask,
        context: &StartContext,
    ) -> Result<Arc<dyn ExecutionHandle>, ExecutorError> {
        Ok(Arc::new(SimulatedRun {
            task_id: context.task_id.to_string(),
            description: task.description.clone(),
            started: Instant::now(),
            config: self.clone(),
            cancel: CancellationToken::new(),
        }))
    }
}

struct SimulatedRun {
    task_id: String,
    description: String,
    started: Instant,
    config: SimulatedExecutor,
    cancel: CancellationToken,
}

#[async_trait]
impl ExecutionHandle for SimulatedRun {
    fn poll_progress(&self) -> Option<i64> {
        if self.config.silent {
            return None;
        }
        let total = self.config.duration.as_millis().max(1);
        let done = self.started.elapsed().as_millis();
        Some((done * 100 / total) as i64)
    }

    async fn await_result(&self) -> Result<Value, ExecutorError> {
        tokio::select! {
            _ = tokio::time::sleep(self.config.duration) => {}
            _ = self.cancel.cancelled() => return Err(ExecutorError::new("cancelled")),
        }

        if self.config.fail {
            return Err(ExecutorError::new(format!("simulated failure in '{}'", self.description)));
        }
        Ok(json!({
            "status": "success",
            "task_id": self.task_id,
            "result": "Task completed",
        }))
    }

    fn cancel(&self) {
        self.cancel.cancel();
    }
}
