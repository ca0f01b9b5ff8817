//! Callback dispatch.
//!
//! Hooks run on a per-task worker fed by an ordered channel. Each call is
//! made on the blocking pool, so a hook that blocks its thread never stalls
//! the supervisor's ticks or deadline. Hook errors and panics are caught
//! and logged; they never reach the monitoring call.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use taskwatch_core::{HookError, MonitorError, TaskId};
use tokio::sync::mpsc;
use tokio::task::{self, JoinHandle};
use tracing::{debug, warn};

/// Caller-supplied notification hooks. Every method defaults to a no-op.
pub trait MonitorHooks: Send + Sync {
    /// Called on each interval tick while the task runs.
    fn on_progress(&self, _task_id: &TaskId, _percentage: u8) -> Result<(), HookError> {
        Ok(())
    }

    /// Called once when the executor returns a result.
    fn on_complete(&self, _task_id: &TaskId, _result: &Value) -> Result<(), HookError> {
        Ok(())
    }

    /// Called once when the task fails, times out or is killed.
    fn on_error(&self, _task_id: &TaskId, _error: &MonitorError) -> Result<(), HookError> {
        Ok(())
    }
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl MonitorHooks for NoopHooks {}

type ProgressFn = Box<dyn Fn(&TaskId, u8) + Send + Sync>;
type CompleteFn = Box<dyn Fn(&TaskId, &Value) + Send + Sync>;
type ErrorFn = Box<dyn Fn(&TaskId, &MonitorError) + Send + Sync>;

/// Hooks assembled from closures.
///
/// ```
/// use taskwatch_monitor::CallbackHooks;
///
/// let hooks = CallbackHooks::new()
///     .on_progress(|id, pct| println!("Task {id} progress: {pct}%"))
///     .on_error(|id, err| eprintln!("Task {id} failed: {err}"));
/// # let _ = hooks;
/// ```
#[derive(Default)]
pub struct CallbackHooks {
    progress: Option<ProgressFn>,
    complete: Option<CompleteFn>,
    error: Option<ErrorFn>,
}

impl CallbackHooks {
    /// Create hooks with no callbacks set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the progress callback.
    pub fn on_progress(mut self, f: impl Fn(&TaskId, u8) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    /// Set the completion callback.
    pub fn on_complete(mut self, f: impl Fn(&TaskId, &Value) + Send + Sync + 'static) -> Self {
        self.complete = Some(Box::new(f));
        self
    }

    /// Set the error callback.
    pub fn on_error(mut self, f: impl Fn(&TaskId, &MonitorError) + Send + Sync + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }
}

impl MonitorHooks for CallbackHooks {
    fn on_progress(&self, task_id: &TaskId, percentage: u8) -> Result<(), HookError> {
        if let Some(f) = &self.progress {
            f(task_id, percentage);
        }
        Ok(())
    }

    fn on_complete(&self, task_id: &TaskId, result: &Value) -> Result<(), HookError> {
        if let Some(f) = &self.complete {
            f(task_id, result);
        }
        Ok(())
    }

    fn on_error(&self, task_id: &TaskId, error: &MonitorError) -> Result<(), HookError> {
        if let Some(f) = &self.error {
            f(task_id, error);
        }
        Ok(())
    }
}

impl std::fmt::Debug for CallbackHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackHooks")
            .field("progress", &self.progress.is_some())
            .field("complete", &self.complete.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

/// A notification queued for delivery.
#[derive(Debug, Clone)]
pub(crate) enum HookEvent {
    Progress(u8),
    Complete(Value),
    Error(MonitorError),
}

impl HookEvent {
    fn name(&self) -> &'static str {
        match self {
            HookEvent::Progress(_) => "on_progress",
            HookEvent::Complete(_) => "on_complete",
            HookEvent::Error(_) => "on_error",
        }
    }
}

/// Sending half held by the task record.
pub(crate) type HookSender = mpsc::UnboundedSender<HookEvent>;

/// Per-task hook worker.
pub(crate) struct Dispatcher {
    task_id: TaskId,
    worker: JoinHandle<()>,
}

impl Dispatcher {
    /// Start a worker delivering events to `hooks` in send order.
    ///
    /// The worker exits once every sender has been dropped and the queue
    /// is empty.
    pub(crate) fn spawn(task_id: TaskId, hooks: Option<Arc<dyn MonitorHooks>>) -> (HookSender, Self) {
        let (tx, mut rx) = mpsc::unbounded_channel::<HookEvent>();
        let hooks: Arc<dyn MonitorHooks> = hooks.unwrap_or_else(|| Arc::new(NoopHooks));
        let worker_id = task_id.clone();

        let worker = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let hooks = hooks.clone();
                let task_id = worker_id.clone();
                let call = task::spawn_blocking(move || deliver(&task_id, hooks.as_ref(), &event));
                if let Err(e) = call.await {
                    warn!(task_id = %worker_id, "hook call aborted: {}", e);
                }
            }
            debug!(task_id = %worker_id, "hook worker finished");
        });

        (tx, Self { task_id, worker })
    }

    /// Wait up to `grace` for queued hook calls to finish.
    ///
    /// A worker still busy after the grace period is detached and keeps
    /// running on its own.
    pub(crate) async fn drain(self, grace: Duration) {
        match tokio::time::timeout(grace, self.worker).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(task_id = %self.task_id, "hook worker aborted: {}", e),
            Err(_) => warn!(
                task_id = %self.task_id,
                "hooks still running after {:?}; detaching", grace
            ),
        }
    }
}

fn deliver(task_id: &TaskId, hooks: &dyn MonitorHooks, event: &HookEvent) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match event {
        HookEvent::Progress(percentage) => hooks.on_progress(task_id, *percentage),
        HookEvent::Complete(result) => hooks.on_complete(task_id, result),
        HookEvent::Error(error) => hooks.on_error(task_id, error),
    }));

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(task_id = %task_id, hook = event.name(), "{}", e),
        Err(payload) => warn!(
            task_id = %task_id,
            hook = event.name(),
            "hook panicked: {}",
            panic_message(payload.as_ref())
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<String>>,
    }

    impl MonitorHooks for Recording {
        fn on_progress(&self, _task_id: &TaskId, percentage: u8) -> Result<(), HookError> {
            self.calls.lock().unwrap().push(format!("progress:{percentage}"));
            if percentage == 13 {
                return Err(HookError("unlucky".to_string()));
            }
            if percentage == 66 {
                panic!("hook exploded");
            }
            Ok(())
        }

        fn on_complete(&self, _task_id: &TaskId, _result: &Value) -> Result<(), HookError> {
            self.calls.lock().unwrap().push("complete".to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_events_delivered_in_order_despite_failures() {
        let hooks = Arc::new(Recording::default());
        let (tx, dispatcher) = Dispatcher::spawn(TaskId::from("t"), Some(hooks.clone()));

        tx.send(HookEvent::Progress(13)).unwrap();
        tx.send(HookEvent::Progress(66)).unwrap();
        tx.send(HookEvent::Progress(80)).unwrap();
        tx.send(HookEvent::Complete(Value::Null)).unwrap();
        drop(tx);

        dispatcher.drain(Duration::from_secs(5)).await;

        let calls = hooks.calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["progress:13", "progress:66", "progress:80", "complete"]);
    }

    struct Sleepy(Duration);

    impl MonitorHooks for Sleepy {
        fn on_complete(&self, _task_id: &TaskId, _result: &Value) -> Result<(), HookError> {
            std::thread::sleep(self.0);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_drain_gives_up_on_blocking_hook_after_grace() {
        let (tx, dispatcher) = Dispatcher::spawn(
            TaskId::from("t"),
            Some(Arc::new(Sleepy(Duration::from_secs(2)))),
        );
        tx.send(HookEvent::Complete(Value::Null)).unwrap();
        drop(tx);

        let started = std::time::Instant::now();
        dispatcher.drain(Duration::from_millis(100)).await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_missing_hooks_are_a_noop() {
        let (tx, dispatcher) = Dispatcher::spawn(TaskId::from("t"), None);
        tx.send(HookEvent::Error(MonitorError::Killed(TaskId::from("t")))).unwrap();
        drop(tx);
        dispatcher.drain(Duration::from_secs(5)).await;
    }

    #[test]
    fn test_callback_hooks_invoke_closures() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let hooks = CallbackHooks::new().on_progress(move |id, pct| {
            sink.lock().unwrap().push(format!("{id}:{pct}"));
        });

        MonitorHooks::on_progress(&hooks, &TaskId::from("a"), 40).unwrap();
        MonitorHooks::on_complete(&hooks, &TaskId::from("a"), &Value::Null).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["a:40".to_string()]);
    }
}
