//! Task records.
//!
//! One record per monitored execution. Identity, description, start time
//! and timeout never change after spawn; everything that does change sits
//! behind the record's own lock, so status transitions are linearizable.

use std::time::{Duration, Instant};

use serde_json::Value;
use taskwatch_core::{MonitorError, Result, SubagentTask, TaskId, TaskSnapshot, TaskStatus, Time};
use taskwatch_progress::{CompletionEstimator, ProgressHistory, ProgressSummary};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::dispatcher::{HookEvent, HookSender};

/// Current instant on the runtime clock.
///
/// Goes through tokio so paused test clocks apply to samples as well as
/// timers.
pub(crate) fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// How a task left the running state.
#[derive(Debug)]
pub(crate) enum Termination {
    Completed(Value),
    Failed(MonitorError),
    TimedOut(MonitorError),
    Killed(MonitorError),
}

impl Termination {
    fn status(&self) -> TaskStatus {
        match self {
            Termination::Completed(_) => TaskStatus::Completed,
            Termination::Failed(_) => TaskStatus::Failed,
            Termination::TimedOut(_) => TaskStatus::TimedOut,
            Termination::Killed(_) => TaskStatus::Killed,
        }
    }
}

#[derive(Debug)]
struct RecordState {
    status: TaskStatus,
    last_update_at: Instant,
    finished_at: Option<Instant>,
    history: ProgressHistory,
    result: Option<Value>,
    error: Option<MonitorError>,
    // Taken by the terminal transition; no hook can be queued afterwards.
    hooks: Option<HookSender>,
}

/// One monitored execution.
#[derive(Debug)]
pub(crate) struct TaskRecord {
    task_id: TaskId,
    description: String,
    seq: u64,
    started_at: Instant,
    started_at_wall: Time,
    timeout: Duration,
    cancel: CancellationToken,
    state: Mutex<RecordState>,
}

impl TaskRecord {
    /// Allocate a record in `Running`.
    pub(crate) fn new(
        task_id: TaskId,
        task: &SubagentTask,
        timeout: Duration,
        seq: u64,
        hooks: HookSender,
    ) -> Self {
        let started_at = now();
        Self {
            task_id,
            description: task.description.clone(),
            seq,
            started_at,
            started_at_wall: chrono::Utc::now(),
            timeout,
            cancel: CancellationToken::new(),
            state: Mutex::new(RecordState {
                status: TaskStatus::Running,
                last_update_at: started_at,
                finished_at: None,
                history: ProgressHistory::new(),
                result: None,
                error: None,
                hooks: Some(hooks),
            }),
        }
    }

    pub(crate) fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Sort key for listings: spawn time, then spawn order.
    pub(crate) fn order_key(&self) -> (Instant, u64) {
        (self.started_at, self.seq)
    }

    pub(crate) fn started_at(&self) -> Instant {
        self.started_at
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) async fn status(&self) -> TaskStatus {
        self.state.lock().await.status
    }

    /// Handle one interval tick.
    ///
    /// Appends `polled` as a sample when present, then queues the progress
    /// hook with the latest known percentage. Returns `None` when the task
    /// is already terminal and the tick is dropped.
    pub(crate) async fn tick(&self, polled: Option<i64>, elapsed_fallback: bool) -> Option<u8> {
        let mut state = self.state.lock().await;
        if state.status.is_terminal() {
            return None;
        }

        let at = now();
        if let Some(raw) = polled {
            state.history.record(at, raw);
        }
        state.last_update_at = at;

        let percentage = match state.history.latest_percentage() {
            Some(p) => p,
            None if elapsed_fallback => self.elapsed_estimate(at),
            None => 0,
        };

        if let Some(hooks) = &state.hooks {
            let _ = hooks.send(HookEvent::Progress(percentage));
        }
        Some(percentage)
    }

    /// Append a pushed sample. Returns `false` once the task is terminal.
    pub(crate) async fn record_sample(&self, raw: i64) -> bool {
        let mut state = self.state.lock().await;
        if state.status.is_terminal() {
            return false;
        }
        let at = now();
        state.history.record(at, raw);
        state.last_update_at = at;
        true
    }

    /// Apply a terminal transition.
    ///
    /// The first transition wins and queues exactly one completion or error
    /// hook; later calls return `false` and change nothing.
    pub(crate) async fn finalize(&self, termination: Termination) -> bool {
        let mut state = self.state.lock().await;
        if state.status.is_terminal() {
            return false;
        }

        let at = now();
        state.status = termination.status();
        state.last_update_at = at;
        state.finished_at = Some(at);

        let event = match termination {
            Termination::Completed(value) => {
                state.history.record(at, 100);
                state.result = Some(value.clone());
                HookEvent::Complete(value)
            }
            Termination::Failed(error) | Termination::TimedOut(error) | Termination::Killed(error) => {
                state.error = Some(error.clone());
                HookEvent::Error(error)
            }
        };

        if let Some(hooks) = state.hooks.take() {
            let _ = hooks.send(event);
        }
        true
    }

    /// Terminal resolution of the task, or `None` while it still runs.
    pub(crate) async fn outcome(&self) -> Option<Result<Value>> {
        let state = self.state.lock().await;
        if !state.status.is_terminal() {
            return None;
        }
        match (&state.result, &state.error) {
            (Some(value), _) => Some(Ok(value.clone())),
            (None, Some(error)) => Some(Err(error.clone())),
            (None, None) => None,
        }
    }

    pub(crate) async fn snapshot(&self) -> TaskSnapshot {
        let state = self.state.lock().await;
        let current = now();
        let until = state.finished_at.unwrap_or(current);

        let estimated_remaining = if state.status.is_terminal() {
            None
        } else {
            CompletionEstimator
                .estimate_completion(state.history.samples(), current)
                .remaining_from(current)
        };

        TaskSnapshot {
            task_id: self.task_id.clone(),
            description: self.description.clone(),
            status: state.status,
            latest_percentage: state.history.latest_percentage().unwrap_or(0),
            elapsed: until.saturating_duration_since(self.started_at),
            idle: current.saturating_duration_since(state.last_update_at),
            started_at: self.started_at_wall,
            samples: state.history.len(),
            estimated_remaining,
            error: state.error.as_ref().map(ToString::to_string),
        }
    }

    pub(crate) async fn summary(&self) -> ProgressSummary {
        let state = self.state.lock().await;
        CompletionEstimator.summarize(state.history.samples(), now())
    }

    // Never claims 100% before the executor actually finishes.
    fn elapsed_estimate(&self, at: Instant) -> u8 {
        let elapsed = at.saturating_duration_since(self.started_at).as_millis();
        let timeout = self.timeout.as_millis().max(1);
        (elapsed * 100 / timeout).min(99) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn record(timeout_secs: u64) -> (TaskRecord, mpsc::UnboundedReceiver<HookEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = SubagentTask::new("Research AI topic");
        let record = TaskRecord::new(TaskId::from("r1"), &task, Duration::from_secs(timeout_secs), 0, tx);
        (record, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_appends_polled_sample() {
        let (record, mut rx) = record(900);
        tokio::time::advance(Duration::from_secs(90)).await;

        assert_eq!(record.tick(Some(150), true).await, Some(100));
        assert!(matches!(rx.recv().await, Some(HookEvent::Progress(100))));

        let snapshot = record.snapshot().await;
        assert_eq!(snapshot.samples, 1);
        assert_eq!(snapshot.latest_percentage, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_without_samples_uses_elapsed_estimate() {
        let (record, _rx) = record(900);
        tokio::time::advance(Duration::from_secs(450)).await;
        assert_eq!(record.tick(None, true).await, Some(50));
        assert_eq!(record.tick(None, false).await, Some(0));

        tokio::time::advance(Duration::from_secs(900)).await;
        assert_eq!(record.tick(None, true).await, Some(99));
        assert_eq!(record.snapshot().await.samples, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finalize_is_idempotent() {
        let (record, mut rx) = record(900);

        assert!(record.finalize(Termination::Completed(serde_json::json!({"ok": true}))).await);
        assert!(!record.finalize(Termination::Killed(MonitorError::Killed(TaskId::from("r1")))).await);

        assert_eq!(record.status().await, TaskStatus::Completed);
        assert!(matches!(record.outcome().await, Some(Ok(_))));
        assert!(matches!(rx.recv().await, Some(HookEvent::Complete(_))));
        // The sender was consumed by the winning transition.
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_after_terminal_are_dropped() {
        let (record, _rx) = record(900);
        let err = MonitorError::Timeout {
            task_id: TaskId::from("r1"),
            timeout: Duration::from_secs(900),
        };
        assert!(record.finalize(Termination::TimedOut(err)).await);
        assert_eq!(record.tick(Some(10), true).await, None);
        assert!(!record.record_sample(20).await);

        let snapshot = record.snapshot().await;
        assert_eq!(snapshot.status, TaskStatus::TimedOut);
        assert_eq!(snapshot.samples, 0);
        assert!(snapshot.error.unwrap().contains("exceeded timeout"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_freezes_at_finish() {
        let (record, _rx) = record(900);
        tokio::time::advance(Duration::from_secs(30)).await;
        record.finalize(Termination::Completed(Value::Null)).await;
        tokio::time::advance(Duration::from_secs(60)).await;

        let snapshot = record.snapshot().await;
        assert_eq!(snapshot.elapsed, Duration::from_secs(30));
        assert_eq!(snapshot.idle, Duration::from_secs(60));
        assert_eq!(snapshot.latest_percentage, 100);
    }
}
