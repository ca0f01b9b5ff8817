//! Public monitoring API.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use taskwatch_core::{MonitorError, Result, SubagentTask, TaskId, TaskSnapshot};
use taskwatch_progress::ProgressSummary;
use tracing::{debug, error, info, warn};

use crate::config::{ensure_positive, MonitorConfig};
use crate::dispatcher::{Dispatcher, MonitorHooks};
use crate::executor::Executor;
use crate::record::Termination;
use crate::registry::Registry;
use crate::scheduler::Supervisor;

/// Per-spawn options.
#[derive(Clone, Default)]
pub struct SpawnOptions {
    /// Timeout for this task; the monitor's `timeout_threshold` when unset
    pub timeout: Option<Duration>,
    /// Identifier to track the task under; generated when unset
    pub task_id: Option<TaskId>,
    /// Notification hooks
    pub hooks: Option<Arc<dyn MonitorHooks>>,
}

impl SpawnOptions {
    /// Options with every field unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the task id.
    pub fn with_task_id(mut self, task_id: impl Into<TaskId>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// Set the hooks.
    pub fn with_hooks(mut self, hooks: impl MonitorHooks + 'static) -> Self {
        self.hooks = Some(Arc::new(hooks));
        self
    }

    /// Set shared hooks.
    pub fn with_shared_hooks(mut self, hooks: Arc<dyn MonitorHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }
}

impl std::fmt::Debug for SpawnOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnOptions")
            .field("timeout", &self.timeout)
            .field("task_id", &self.task_id)
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

/// Supervises subagent executions and synthesizes progress for them.
///
/// Each monitor owns its registry and configuration; nothing is shared
/// between monitors.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use taskwatch_monitor::{Executor, Monitor, MonitorConfig, SpawnOptions, SubagentTask};
/// # async fn run(executor: Arc<dyn Executor>) -> taskwatch_monitor::Result<()> {
/// let monitor = Monitor::new(executor, MonitorConfig::default())?;
/// let result = monitor
///     .spawn_with_monitoring(
///         SubagentTask::new("Research AI topic").with_tools(["web_search"]),
///         SpawnOptions::new().with_timeout(std::time::Duration::from_secs(300)),
///     )
///     .await?;
/// # let _ = result;
/// # Ok(())
/// # }
/// ```
pub struct Monitor {
    config: MonitorConfig,
    executor: Arc<dyn Executor>,
    registry: Arc<Registry>,
}

impl Monitor {
    /// Create a monitor, failing fast on an invalid configuration.
    pub fn new(executor: Arc<dyn Executor>, config: MonitorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            executor,
            registry: Arc::new(Registry::new()),
        })
    }

    /// Create a monitor with the default configuration.
    pub fn with_defaults(executor: Arc<dyn Executor>) -> Self {
        Self {
            config: MonitorConfig::default(),
            executor,
            registry: Arc::new(Registry::new()),
        }
    }

    /// The monitor's configuration
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Start a task and wait for its terminal state.
    ///
    /// Progress hooks fire every `update_interval` while this call is
    /// pending. Resolves with the executor's result, or with exactly one
    /// of [`MonitorError::Timeout`], [`MonitorError::Subagent`] or
    /// [`MonitorError::Killed`]. Supervision runs on its own task, so
    /// dropping this future does not abandon the record.
    pub async fn spawn_with_monitoring(&self, task: SubagentTask, options: SpawnOptions) -> Result<Value> {
        let timeout = options.timeout.unwrap_or(self.config.timeout_threshold);
        ensure_positive("timeout", timeout)?;
        let task_id = options.task_id.unwrap_or_default();

        let (hooks, dispatcher) = Dispatcher::spawn(task_id.clone(), options.hooks);
        let record = self.registry.create(task_id.clone(), &task, timeout, hooks).await?;

        info!(
            task_id = %task_id,
            tools = ?task.tools,
            "Spawned subagent; updates every {}s, timeout {}s",
            self.config.update_interval.as_secs(),
            timeout.as_secs()
        );

        let supervisor = Supervisor::new(
            record.clone(),
            self.executor.clone(),
            task,
            self.config.clone(),
            dispatcher,
        );

        match tokio::spawn(supervisor.run()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(task_id = %task_id, "Supervisor aborted: {}", e);
                let failure = MonitorError::Supervisor {
                    task_id: task_id.clone(),
                    reason: e.to_string(),
                };
                record.finalize(Termination::Failed(failure.clone())).await;
                record.cancel_token().cancel();
                Err(failure)
            }
        }
    }

    /// Snapshots of tasks that have not reached a terminal state, oldest first.
    pub async fn list_active_tasks(&self) -> Vec<TaskSnapshot> {
        self.registry
            .list()
            .await
            .into_iter()
            .filter(|s| !s.is_finished())
            .collect()
    }

    /// Snapshots of every tracked task, finished ones included, oldest first.
    pub async fn list_tasks(&self) -> Vec<TaskSnapshot> {
        self.registry.list().await
    }

    /// Snapshot of one task, including finished ones not yet removed.
    pub async fn check_task(&self, task_id: &TaskId) -> Option<TaskSnapshot> {
        let record = self.registry.get(task_id).await?;
        Some(record.snapshot().await)
    }

    /// Kill a live task.
    ///
    /// Returns `false` when the task is unknown or already terminal, in
    /// which case nothing changes.
    pub async fn kill_task(&self, task_id: &TaskId) -> bool {
        let Some(record) = self.registry.get(task_id).await else {
            warn!(task_id = %task_id, "Task not found");
            return false;
        };

        let killed = record
            .finalize(Termination::Killed(MonitorError::Killed(task_id.clone())))
            .await;
        if killed {
            record.cancel_token().cancel();
            info!(task_id = %task_id, "Killed task");
        } else {
            debug!(task_id = %task_id, "kill ignored; task already finished");
        }
        killed
    }

    /// Record a percentage pushed by the executor.
    ///
    /// Samples for a finished task are ignored.
    pub async fn report_progress(&self, task_id: &TaskId, percentage: i64) -> Result<()> {
        let record = self
            .registry
            .get(task_id)
            .await
            .ok_or_else(|| MonitorError::TaskNotFound(task_id.clone()))?;

        if !record.record_sample(percentage).await {
            debug!(task_id = %task_id, percentage, "sample for finished task ignored");
        }
        Ok(())
    }

    /// Rate and completion estimate for a task.
    pub async fn progress_summary(&self, task_id: &TaskId) -> Result<ProgressSummary> {
        let record = self
            .registry
            .get(task_id)
            .await
            .ok_or_else(|| MonitorError::TaskNotFound(task_id.clone()))?;
        Ok(record.summary().await)
    }

    /// Remove a finished task. Live tasks are left in place.
    pub async fn remove_task(&self, task_id: &TaskId) -> bool {
        let removed = self.registry.remove_finished(task_id).await;
        if removed {
            debug!(task_id = %task_id, "removed task record");
        }
        removed
    }

    /// Remove every finished task, returning how many were removed.
    pub async fn prune_finished(&self) -> usize {
        let pruned = self.registry.prune_finished().await;
        if pruned > 0 {
            debug!(pruned, "pruned finished task records");
        }
        pruned
    }
}
