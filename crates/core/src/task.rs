//! Subagent task description and point-in-time snapshots.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::id::TaskId;
use crate::status::TaskStatus;
use crate::Time;

/// The unit of work handed to an executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubagentTask {
    /// What the subagent is asked to do
    pub description: String,
    /// Tools made available to the subagent
    pub tools: Vec<String>,
}

impl SubagentTask {
    /// Create a task with no tools.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            tools: Vec::new(),
        }
    }

    /// Set the tools made available to the subagent.
    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }
}

/// Immutable copy of a task record's observable fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSnapshot {
    /// Task identifier
    pub task_id: TaskId,
    /// Task description
    pub description: String,
    /// Status at the time of the snapshot
    pub status: TaskStatus,
    /// Latest known percentage (0-100)
    pub latest_percentage: u8,
    /// Time since spawn, frozen once the task is terminal
    #[serde(with = "crate::duration_secs")]
    pub elapsed: Duration,
    /// Time since the last tick or sample
    #[serde(with = "crate::duration_secs")]
    pub idle: Duration,
    /// Wall-clock spawn time
    pub started_at: Time,
    /// Number of recorded progress samples
    pub samples: usize,
    /// Projected time left, when the rate allows a projection
    #[serde(default, with = "crate::duration_secs::option")]
    pub estimated_remaining: Option<Duration>,
    /// Terminal error, if the task ended without a result
    pub error: Option<String>,
}

impl TaskSnapshot {
    /// Whether the snapshot shows a terminal status.
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subagent_task_builder() {
        let task = SubagentTask::new("Research renewable energy trends")
            .with_tools(["web_search", "calculator"]);
        assert_eq!(task.description, "Research renewable energy trends");
        assert_eq!(task.tools, vec!["web_search".to_string(), "calculator".to_string()]);
    }

    #[test]
    fn test_snapshot_durations_serialize_as_seconds() {
        let snapshot = TaskSnapshot {
            task_id: TaskId::from("t1"),
            description: "Summarize logs".to_string(),
            status: TaskStatus::Running,
            latest_percentage: 40,
            elapsed: Duration::from_millis(1500),
            idle: Duration::from_secs(2),
            started_at: chrono::Utc::now(),
            samples: 3,
            estimated_remaining: None,
            error: None,
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["elapsed"], 1.5);
        assert_eq!(json["idle"], 2.0);
        assert!(json["estimated_remaining"].is_null());

        let with_eta = TaskSnapshot {
            estimated_remaining: Some(Duration::from_secs(420)),
            ..snapshot
        };
        let json = serde_json::to_value(&with_eta).unwrap();
        assert_eq!(json["estimated_remaining"], 420.0);

        let parsed: TaskSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.elapsed, Duration::from_millis(1500));
        assert_eq!(parsed.estimated_remaining, Some(Duration::from_secs(420)));
    }
}
