//! In-process scheduler for delayed and repeating actions.
//!
//! Each scheduled task is a tokio task plus an entry in a shared table keyed
//! by an opaque id (`<kind>_<uuid>`). Entries are removed when a task is
//! cancelled, when a one-shot task fires, or when a repeating task reaches its
//! run limit. Nothing outside this module touches the table.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use schemars::JsonSchema;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domains::tools::ToolError;

/// Longest delay or repeat interval tools accept.
pub const MAX_DELAY: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Future produced by a task action.
pub type ActionFuture = Pin<Box<dyn Future<Output = Result<(), ToolError>> + Send>>;

/// The work a task performs each time it fires.
pub type TaskAction = Arc<dyn Fn() -> ActionFuture + Send + Sync>;

/// When and how often a task fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Fire once after `delay`.
    Once { delay: Duration },
    /// Fire after `delay`, then every `interval`, at most `max_runs` times.
    Repeating {
        delay: Duration,
        interval: Duration,
        max_runs: Option<u32>,
    },
}

/// Public view of a live task.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct TaskInfo {
    /// Opaque task id.
    pub id: String,
    /// Kind of action, e.g. `notification` or `power`.
    pub kind: String,
    /// Short human-readable description.
    pub label: String,
    /// `once` or `repeating`.
    pub schedule: String,
    /// Times the action has fired so far.
    pub runs: u32,
    /// Run limit for repeating tasks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_runs: Option<u32>,
    /// Interval between repeats in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
    /// When the task was scheduled (RFC 3339).
    pub created_at: String,
    /// When the task first fires (RFC 3339).
    pub first_run_at: String,
}

struct TaskEntry {
    info: TaskInfo,
    handle: Option<JoinHandle<()>>,
}

/// Shared handle to the task table. Clones see the same tasks.
#[derive(Clone, Default)]
pub struct TaskScheduler {
    tasks: Arc<DashMap<String, TaskEntry>>,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `action` and return the new task id.
    pub fn schedule(
        &self,
        kind: &str,
        label: impl Into<String>,
        schedule: Schedule,
        action: TaskAction,
    ) -> String {
        let id = format!("{}_{}", kind, Uuid::new_v4().simple());
        let now: DateTime<Utc> = Utc::now();

        let (delay, interval, max_runs, schedule_name) = match schedule {
            Schedule::Once { delay } => (delay, None, Some(1), "once"),
            Schedule::Repeating {
                delay,
                interval,
                max_runs,
            } => (delay, Some(interval), max_runs, "repeating"),
        };
        // Saturates instead of overflowing for delays beyond chrono's range.
        let first_run_at = chrono::Duration::from_std(delay)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let info = TaskInfo {
            id: id.clone(),
            kind: kind.to_string(),
            label: label.into(),
            schedule: schedule_name.to_string(),
            runs: 0,
            max_runs: interval.and(max_runs),
            interval_ms: interval.map(|i| i.as_millis() as u64),
            created_at: now.to_rfc3339(),
            first_run_at: first_run_at.to_rfc3339(),
        };

        // The entry exists before the task can observe the table.
        self.tasks.insert(id.clone(), TaskEntry { info, handle: None });

        let handle = tokio::spawn(run_task(
            self.tasks.clone(),
            id.clone(),
            delay,
            interval,
            max_runs,
            action,
        ));

        match self.tasks.get_mut(&id) {
            Some(mut entry) => entry.handle = Some(handle),
            // Already finished (zero delay, single run).
            None => handle.abort(),
        }

        info!(task_id = %id, kind, schedule = schedule_name, "Task scheduled");
        id
    }

    /// Status of a live task.
    pub fn status(&self, id: &str) -> Option<TaskInfo> {
        self.tasks.get(id).map(|entry| entry.info.clone())
    }

    /// Live tasks, optionally filtered by kind, oldest first.
    pub fn list(&self, kind: Option<&str>) -> Vec<TaskInfo> {
        let mut tasks: Vec<TaskInfo> = self
            .tasks
            .iter()
            .filter(|entry| kind.is_none_or(|k| entry.info.kind == k))
            .map(|entry| entry.info.clone())
            .collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        tasks
    }

    /// Cancel a task. Returns `false` if no such task is live.
    pub fn cancel(&self, id: &str) -> bool {
        match self.tasks.remove(id) {
            Some((_, entry)) => {
                if let Some(handle) = entry.handle {
                    handle.abort();
                }
                info!(task_id = %id, "Task cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel every live task of `kind` (or every task). Returns the count.
    pub fn cancel_all(&self, kind: Option<&str>) -> usize {
        let ids: Vec<String> = self
            .tasks
            .iter()
            .filter(|entry| kind.is_none_or(|k| entry.info.kind == k))
            .map(|entry| entry.key().clone())
            .collect();
        ids.iter().filter(|id| self.cancel(id)).count()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

async fn run_task(
    tasks: Arc<DashMap<String, TaskEntry>>,
    id: String,
    delay: Duration,
    interval: Option<Duration>,
    max_runs: Option<u32>,
    action: TaskAction,
) {
    sleep(delay).await;

    let mut runs = 0u32;
    loop {
        if !tasks.contains_key(&id) {
            return;
        }

        if let Err(e) = action().await {
            warn!(task_id = %id, "Scheduled action failed: {}", e);
        }
        runs += 1;

        let finished = interval.is_none() || max_runs.is_some_and(|max| runs >= max);
        if finished {
            tasks.remove(&id);
            info!(task_id = %id, runs, "Task completed");
            return;
        }

        if let Some(mut entry) = tasks.get_mut(&id) {
            entry.info.runs = runs;
        } else {
            return;
        }

        if let Some(interval) = interval {
            sleep(interval).await;
        }
    }
}

/// Wrap an async closure as a [`TaskAction`].
pub fn action<F, Fut>(f: F) -> TaskAction
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ToolError>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()) as ActionFuture)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_action(counter: Arc<AtomicU32>) -> TaskAction {
        action(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn test_repeating_task_lifecycle() {
        let scheduler = TaskScheduler::new();
        let counter = Arc::new(AtomicU32::new(0));

        let id = scheduler.schedule(
            "notification",
            "stand up",
            Schedule::Repeating {
                delay: Duration::from_secs(60),
                interval: Duration::from_secs(60),
                max_runs: None,
            },
            counting_action(counter.clone()),
        );

        assert!(id.starts_with("notification_"));
        let info = scheduler.status(&id).expect("task is live");
        assert_eq!(info.schedule, "repeating");
        assert_eq!(info.interval_ms, Some(60_000));

        assert!(scheduler.cancel(&id));
        assert!(scheduler.status(&id).is_none());
        assert!(!scheduler.cancel(&id));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_one_shot_fires_and_disappears() {
        let scheduler = TaskScheduler::new();
        let counter = Arc::new(AtomicU32::new(0));

        let id = scheduler.schedule(
            "power",
            "lock",
            Schedule::Once {
                delay: Duration::from_millis(10),
            },
            counting_action(counter.clone()),
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(scheduler.status(&id).is_none());
        assert!(!scheduler.cancel(&id));
    }

    #[tokio::test]
    async fn test_repeating_task_stops_at_max_runs() {
        let scheduler = TaskScheduler::new();
        let counter = Arc::new(AtomicU32::new(0));

        let id = scheduler.schedule(
            "notification",
            "ping",
            Schedule::Repeating {
                delay: Duration::ZERO,
                interval: Duration::from_millis(5),
                max_runs: Some(3),
            },
            counting_action(counter.clone()),
        );

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert!(scheduler.status(&id).is_none());
    }

    #[tokio::test]
    async fn test_failing_action_keeps_repeating() {
        let scheduler = TaskScheduler::new();
        let counter = Arc::new(AtomicU32::new(0));
        let failing = {
            let counter = counter.clone();
            action(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ToolError::upstream("notify-send missing"))
                }
            })
        };

        scheduler.schedule(
            "notification",
            "flaky",
            Schedule::Repeating {
                delay: Duration::ZERO,
                interval: Duration::from_millis(5),
                max_runs: Some(2),
            },
            failing,
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(scheduler.is_empty());
    }

    #[tokio::test]
    async fn test_list_filters_by_kind_and_cancel_all() {
        let scheduler = TaskScheduler::new();
        let counter = Arc::new(AtomicU32::new(0));
        let later = Schedule::Once {
            delay: Duration::from_secs(600),
        };

        scheduler.schedule("notification", "a", later, counting_action(counter.clone()));
        scheduler.schedule("notification", "b", later, counting_action(counter.clone()));
        scheduler.schedule("power", "c", later, counting_action(counter.clone()));

        assert_eq!(scheduler.list(None).len(), 3);
        assert_eq!(scheduler.list(Some("notification")).len(), 2);
        assert_eq!(scheduler.list(Some("power")).len(), 1);

        assert_eq!(scheduler.cancel_all(Some("notification")), 2);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.cancel_all(None), 1);
        assert!(scheduler.is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_delay_does_not_panic() {
        let scheduler = TaskScheduler::new();
        let id = scheduler.schedule(
            "power",
            "far future",
            Schedule::Once {
                delay: Duration::from_secs(10_000_000_000_000),
            },
            counting_action(Arc::new(AtomicU32::new(0))),
        );

        let info = scheduler.status(&id).expect("task is live");
        assert_eq!(info.first_run_at, DateTime::<Utc>::MAX_UTC.to_rfc3339());
        assert!(scheduler.cancel(&id));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let scheduler = TaskScheduler::new();
        let other = scheduler.clone();
        let id = scheduler.schedule(
            "power",
            "shutdown",
            Schedule::Once {
                delay: Duration::from_secs(600),
            },
            counting_action(Arc::new(AtomicU32::new(0))),
        );
        assert!(other.cancel(&id));
        assert!(scheduler.status(&id).is_none());
    }
}
