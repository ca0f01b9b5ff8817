//! Subagent Monitoring
//!
//! Supervises long-running executions that report little or no progress
//! of their own: periodic progress notifications, stall detection through
//! a timeout, and a registry for listing, inspecting and killing tasks.

#![warn(missing_docs)]

pub mod config;
pub mod dispatcher;
pub mod executor;
pub mod monitor;
mod record;
mod registry;
mod scheduler;

pub use config::MonitorConfig;
pub use dispatcher::{CallbackHooks, MonitorHooks, NoopHooks};
pub use executor::{ExecutionHandle, Executor, StartContext};
pub use monitor::{Monitor, SpawnOptions};

pub use taskwatch_core::{
    ExecutorError, HookError, MonitorError, Result, SubagentTask, TaskId, TaskSnapshot, TaskStatus,
};
pub use taskwatch_progress::ProgressSummary;
