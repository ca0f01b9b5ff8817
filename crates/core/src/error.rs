//! Error taxonomy for monitored executions.

use std::time::Duration;

use crate::id::TaskId;

/// Result type for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Failure reported by an executor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ExecutorError {
    message: String,
}

impl ExecutorError {
    /// Create an executor error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The underlying cause as reported by the executor
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure reported by a caller-supplied hook. Logged, never surfaced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("hook failed: {0}")]
pub struct HookError(pub String);

/// Errors that can occur while monitoring a task.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MonitorError {
    /// A live record with the same id already exists
    #[error("Task {0} is already being monitored")]
    DuplicateTaskId(TaskId),

    /// No record with this id
    #[error("Task {0} not found")]
    TaskNotFound(TaskId),

    /// The timeout elapsed before the executor finished
    #[error("Task {task_id} exceeded timeout of {timeout:?}")]
    Timeout {
        /// Task that timed out
        task_id: TaskId,
        /// Timeout that was applied
        timeout: Duration,
    },

    /// The executor reported a failure
    #[error("Task {task_id} failed: {source}")]
    Subagent {
        /// Task that failed
        task_id: TaskId,
        /// Executor-reported cause
        source: ExecutorError,
    },

    /// The task was terminated through an explicit kill
    #[error("Task {0} was killed")]
    Killed(TaskId),

    /// Invalid interval or timeout
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The supervisory routine ended abnormally
    #[error("Supervisor for task {task_id} aborted: {reason}")]
    Supervisor {
        /// Task whose supervisor aborted
        task_id: TaskId,
        /// Why it aborted
        reason: String,
    },
}

impl MonitorError {
    /// Whether this error is the timeout-triggered terminal error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, MonitorError::Timeout { .. })
    }
}
