//! Task lifecycle status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a monitored task.
///
/// `Pending -> Running -> {Completed | Failed | TimedOut | Killed}`; the
/// four terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Record allocated, executor not yet started
    Pending,
    /// Executor is running under supervision
    Running,
    /// Executor returned a result
    Completed,
    /// Executor reported a failure
    Failed,
    /// Timeout elapsed before the executor finished
    TimedOut,
    /// Terminated by an explicit kill
    Killed,
}

impl TaskStatus {
    /// Whether no further transition can leave this status.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::TimedOut | TaskStatus::Killed
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::TimedOut => write!(f, "timeout"),
            TaskStatus::Killed => write!(f, "killed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::TimedOut.is_terminal());
        assert!(TaskStatus::Killed.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(TaskStatus::TimedOut.to_string(), "timeout");
        assert_eq!(TaskStatus::Killed.to_string(), "killed");
    }
}
