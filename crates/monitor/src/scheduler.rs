//! Supervisory routine.
//!
//! One routine per monitored task races four events: an explicit kill,
//! the executor finishing, the timeout deadline and the interval tick.
//! It is the only writer of the task's terminal transition apart from
//! [`Monitor::kill_task`](crate::Monitor::kill_task); the record decides
//! which of the two wins.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use taskwatch_core::{ExecutorError, MonitorError, Result, SubagentTask};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::MonitorConfig;
use crate::dispatcher::Dispatcher;
use crate::executor::{ExecutionHandle, Executor, StartContext};
use crate::record::{TaskRecord, Termination};

enum Exit {
    Killed,
    Finished(std::result::Result<Value, ExecutorError>),
    DeadlineElapsed,
}

/// Drives one task from spawn to its terminal state.
pub(crate) struct Supervisor {
    record: Arc<TaskRecord>,
    executor: Arc<dyn Executor>,
    task: SubagentTask,
    config: MonitorConfig,
    dispatcher: Dispatcher,
}

impl Supervisor {
    pub(crate) fn new(
        record: Arc<TaskRecord>,
        executor: Arc<dyn Executor>,
        task: SubagentTask,
        config: MonitorConfig,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            record,
            executor,
            task,
            config,
            dispatcher,
        }
    }

    /// Run until the task is terminal and its hooks have drained.
    pub(crate) async fn run(self) -> Result<Value> {
        let Supervisor {
            record,
            executor,
            task,
            config,
            dispatcher,
        } = self;
        let task_id = record.task_id().clone();

        let context = StartContext {
            task_id: task_id.clone(),
            timeout: record.timeout(),
        };
        let deadline = Instant::from_std(record.started_at()) + record.timeout();
        let started = tokio::select! {
            biased;
            _ = record.cancel_token().cancelled() => None,
            _ = time::sleep_until(deadline) => {
                timed_out(&record).await;
                None
            }
            started = executor.start(&task, &context) => Some(started),
        };

        match started {
            Some(Ok(handle)) => supervise(&record, handle.as_ref(), &config).await,
            Some(Err(source)) => {
                let message = source.to_string();
                let failure = MonitorError::Subagent {
                    task_id: task_id.clone(),
                    source,
                };
                if record.finalize(Termination::Failed(failure)).await {
                    error!(task_id = %task_id, "Executor failed to start: {}", message);
                }
            }
            None => debug!(task_id = %task_id, "task ended before the executor started"),
        }

        dispatcher.drain(config.hook_grace).await;

        match record.outcome().await {
            Some(outcome) => outcome,
            None => Err(MonitorError::Supervisor {
                task_id,
                reason: "routine exited before a terminal state".to_string(),
            }),
        }
    }
}

async fn supervise(record: &TaskRecord, handle: &dyn ExecutionHandle, config: &MonitorConfig) {
    let task_id = record.task_id();
    let started = Instant::from_std(record.started_at());

    let mut ticker = time::interval_at(started + config.update_interval, config.update_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let deadline = time::sleep_until(started + record.timeout());
    tokio::pin!(deadline);
    let cancel = record.cancel_token().clone();
    let outcome = handle.await_result();
    tokio::pin!(outcome);

    let exit = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break Exit::Killed,
            result = &mut outcome => break Exit::Finished(result),
            _ = &mut deadline => break Exit::DeadlineElapsed,
            _ = ticker.tick() => {
                match record.tick(handle.poll_progress(), config.elapsed_fallback).await {
                    Some(percentage) => debug!(task_id = %task_id, percentage, "progress tick"),
                    None => debug!(task_id = %task_id, "tick after terminal state dropped"),
                }
            }
        }
    };

    match exit {
        Exit::Finished(Ok(value)) => {
            if record.finalize(Termination::Completed(value)).await {
                info!(task_id = %task_id, "Task completed");
            }
        }
        Exit::Finished(Err(source)) => {
            let message = source.to_string();
            let failure = MonitorError::Subagent {
                task_id: task_id.clone(),
                source,
            };
            if record.finalize(Termination::Failed(failure)).await {
                error!(task_id = %task_id, "Task failed: {}", message);
            }
        }
        Exit::DeadlineElapsed => {
            timed_out(record).await;
            stop_executor(record, handle, outcome, config.cancel_grace).await;
        }
        Exit::Killed => {
            debug!(task_id = %task_id, "kill observed by supervisor");
            stop_executor(record, handle, outcome, config.cancel_grace).await;
        }
    }
}

async fn timed_out(record: &TaskRecord) {
    let task_id = record.task_id();
    let timeout = record.timeout();
    let failure = MonitorError::Timeout {
        task_id: task_id.clone(),
        timeout,
    };
    if record.finalize(Termination::TimedOut(failure)).await {
        error!(task_id = %task_id, "Task timed out after {}s", timeout.as_secs());
    }
    record.cancel_token().cancel();
}

/// Cancel the executor and give it `grace` to wind down.
async fn stop_executor<F>(record: &TaskRecord, handle: &dyn ExecutionHandle, outcome: Pin<&mut F>, grace: Duration)
where
    F: Future<Output = std::result::Result<Value, ExecutorError>>,
{
    handle.cancel();
    if time::timeout(grace, outcome).await.is_err() {
        warn!(
            task_id = %record.task_id(),
            "executor did not acknowledge cancellation within {:?}", grace
        );
    }
}
