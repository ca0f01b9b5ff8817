//! Taskwatch core data models.
//!
//! Identifiers, task statuses, progress samples and the error taxonomy
//! shared by the progress estimator and the monitor.

#![warn(missing_docs)]

// Identities
mod id;

// Task lifecycle
mod status;
mod task;

// Progress observations
mod sample;

// Errors
mod error;

// Serde helpers
pub mod duration_secs;

pub use id::TaskId;
pub use status::TaskStatus;
pub use task::{SubagentTask, TaskSnapshot};
pub use sample::{clamp_percentage, ProgressSample};
pub use error::{ExecutorError, HookError, MonitorError, Result};

/// Wall-clock timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
