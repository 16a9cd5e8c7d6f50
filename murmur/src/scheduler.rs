//! In-process registry of named one-shot and recurring jobs.
//!
//! A single scan loop wakes every poll interval, reschedules or removes each
//! due task, and hands its execution to a fresh tokio task so a slow job never
//! delays the scan or other jobs. Nothing is persisted; the binary registers
//! its jobs again on every start.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

type TaskCallback = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

struct ScheduledTask {
    next_run: DateTime<Utc>,
    interval: Option<Duration>,
    callback: TaskCallback,
    /// Set while an execution is in flight; a recurring tick that finds it set is skipped.
    running: Arc<AtomicBool>,
}

/// Point-in-time view of one registered task.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TaskSnapshot {
    pub task_id: String,
    pub next_run: DateTime<Utc>,
    pub interval_secs: Option<u64>,
}

pub struct Scheduler {
    tasks: Arc<Mutex<HashMap<String, ScheduledTask>>>,
    poll_interval: Duration,
    next_id: AtomicU64,
    token: Mutex<Option<CancellationToken>>,
    scan_loop: Mutex<Option<JoinHandle<()>>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::with_poll_interval(DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            poll_interval,
            next_id: AtomicU64::new(0),
            token: Mutex::new(None),
            scan_loop: Mutex::new(None),
        }
    }

    /// Register `callback` to first run after `delay`, then every `interval`
    /// (or once when `interval` is `None`). Re-using a task id replaces the task.
    pub fn schedule_task<F, Fut>(
        &self,
        callback: F,
        delay: Duration,
        interval: Option<Duration>,
        task_id: Option<String>,
    ) -> String
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let task_id = task_id.unwrap_or_else(|| {
            let n = self.next_id.fetch_add(1, Ordering::Relaxed);
            format!("task_{n}_{}", Utc::now().timestamp_micros())
        });

        let callback: TaskCallback =
            Arc::new(move || -> BoxFuture<'static, Result<()>> { Box::pin(callback()) });
        let next_run = Utc::now() + to_chrono(delay);

        lock(&self.tasks).insert(
            task_id.clone(),
            ScheduledTask {
                next_run,
                interval,
                callback,
                running: Arc::new(AtomicBool::new(false)),
            },
        );

        tracing::info!(
            task_id = %task_id,
            delay_secs = delay.as_secs_f64(),
            interval_secs = interval.map(|i| i.as_secs_f64()),
            "Scheduled task"
        );
        task_id
    }

    /// Remove a task. In-flight executions run to completion.
    pub fn cancel_task(&self, task_id: &str) -> bool {
        let removed = lock(&self.tasks).remove(task_id).is_some();
        if removed {
            tracing::info!(task_id, "Cancelled task");
        }
        removed
    }

    pub fn scheduled_tasks(&self) -> Vec<TaskSnapshot> {
        let mut snapshot: Vec<TaskSnapshot> = lock(&self.tasks)
            .iter()
            .map(|(task_id, task)| TaskSnapshot {
                task_id: task_id.clone(),
                next_run: task.next_run,
                interval_secs: task.interval.map(|i| i.as_secs()),
            })
            .collect();
        snapshot.sort_by(|a, b| a.next_run.cmp(&b.next_run).then(a.task_id.cmp(&b.task_id)));
        snapshot
    }

    pub fn is_running(&self) -> bool {
        lock(&self.scan_loop).is_some()
    }

    /// Start the scan loop. A second call while running is a no-op.
    pub fn start(&self) {
        let mut scan_loop = lock(&self.scan_loop);
        if scan_loop.is_some() {
            return;
        }

        let token = CancellationToken::new();
        *lock(&self.token) = Some(token.clone());

        let tasks = Arc::clone(&self.tasks);
        let poll_interval = self.poll_interval;
        *scan_loop = Some(tokio::spawn(async move {
            loop {
                dispatch_due(&tasks, Utc::now());
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
        }));

        tracing::info!("Scheduler started");
    }

    /// Stop the scan loop and wait for it to exit. Dispatched executions are
    /// left to finish on their own.
    pub async fn stop(&self) {
        if let Some(token) = lock(&self.token).take() {
            token.cancel();
        }
        let handle = lock(&self.scan_loop).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Scheduler loop ended abnormally");
            }
            tracing::info!("Scheduler stopped");
        }
    }
}

/// Reschedule or remove every task due at `now` and spawn its execution.
/// Clears a task's running flag when its execution ends, unwinding included.
struct RunGuard(Arc<AtomicBool>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn dispatch_due(tasks: &Mutex<HashMap<String, ScheduledTask>>, now: DateTime<Utc>) {
    let mut due = Vec::new();
    {
        let mut guard = lock(tasks);
        let due_ids: Vec<String> = guard
            .iter()
            .filter(|(_, task)| task.next_run <= now)
            .map(|(id, _)| id.clone())
            .collect();

        for task_id in due_ids {
            let recurring = match guard.get_mut(&task_id) {
                Some(task) => match task.interval {
                    Some(interval) => {
                        task.next_run = now + to_chrono(interval);
                        Some((Arc::clone(&task.callback), Arc::clone(&task.running)))
                    }
                    None => None,
                },
                None => continue,
            };

            match recurring {
                Some((callback, running)) => due.push((task_id, callback, running)),
                None => {
                    if let Some(task) = guard.remove(&task_id) {
                        due.push((task_id, task.callback, task.running));
                    }
                }
            }
        }
    }

    for (task_id, callback, running) in due {
        if running.swap(true, Ordering::AcqRel) {
            tracing::warn!(task_id = %task_id, "Previous run still in progress, skipping");
            continue;
        }

        tokio::spawn(async move {
            let _running = RunGuard(running);
            tracing::debug!(task_id = %task_id, "Executing task");
            match callback().await {
                Ok(()) => tracing::debug!(task_id = %task_id, "Task completed"),
                Err(e) => tracing::error!(task_id = %task_id, error = %e, "Task failed"),
            }
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::days(36_500))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MurmurError;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    #[tokio::test]
    async fn test_one_shot_runs_once_and_is_removed() {
        let scheduler = Scheduler::with_poll_interval(Duration::from_millis(5));
        let runs = counter();
        let seen = Arc::clone(&runs);

        let id = scheduler.schedule_task(
            move || {
                let seen = Arc::clone(&seen);
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
            Duration::ZERO,
            None,
            Some("initialize_bots".to_string()),
        );
        assert_eq!(id, "initialize_bots");

        scheduler.start();
        tokio::time::sleep(Duration::from_millis(80)).await;
        scheduler.stop().await;

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(scheduler.scheduled_tasks().is_empty());
    }

    #[tokio::test]
    async fn test_recurring_task_survives_a_panicking_run() {
        let scheduler = Scheduler::with_poll_interval(Duration::from_millis(5));
        let runs = counter();
        let seen = Arc::clone(&runs);

        scheduler.schedule_task(
            move || {
                let seen = Arc::clone(&seen);
                async move {
                    if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                        panic!("first run blows up");
                    }
                    Ok(())
                }
            },
            Duration::ZERO,
            Some(Duration::from_millis(10)),
            Some("run_due_bots".to_string()),
        );

        scheduler.start();
        tokio::time::sleep(Duration::from_millis(200)).await;
        scheduler.stop().await;

        assert!(runs.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_recurring_task_keeps_running_after_failure() {
        let scheduler = Scheduler::with_poll_interval(Duration::from_millis(5));
        let runs = counter();
        let seen = Arc::clone(&runs);

        scheduler.schedule_task(
            move || {
                let seen = Arc::clone(&seen);
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Err(MurmurError::Transport("social network down".to_string()))
                }
            },
            Duration::ZERO,
            Some(Duration::from_millis(10)),
            Some("sync".to_string()),
        );

        scheduler.start();
        tokio::time::sleep(Duration::from_millis(150)).await;
        scheduler.stop().await;

        assert!(runs.load(Ordering::SeqCst) >= 3);
        let snapshot = scheduler.scheduled_tasks();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].task_id, "sync");
        assert_eq!(snapshot[0].interval_secs, Some(0));
    }

    #[tokio::test]
    async fn test_overlapping_runs_are_skipped() {
        let scheduler = Scheduler::with_poll_interval(Duration::from_millis(5));
        let active = counter();
        let max_active = counter();
        let (a, m) = (Arc::clone(&active), Arc::clone(&max_active));

        scheduler.schedule_task(
            move || {
                let (a, m) = (Arc::clone(&a), Arc::clone(&m));
                async move {
                    let now = a.fetch_add(1, Ordering::SeqCst) + 1;
                    m.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(60)).await;
                    a.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            },
            Duration::ZERO,
            Some(Duration::from_millis(5)),
            None,
        );

        scheduler.start();
        tokio::time::sleep(Duration::from_millis(200)).await;
        scheduler.stop().await;

        assert_eq!(max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_and_generated_ids() {
        let scheduler = Scheduler::new();
        let first = scheduler.schedule_task(|| async { Ok(()) }, Duration::from_secs(60), None, None);
        let second =
            scheduler.schedule_task(|| async { Ok(()) }, Duration::from_secs(30), None, None);

        assert_ne!(first, second);
        assert!(first.starts_with("task_"));
        assert_eq!(scheduler.scheduled_tasks()[0].task_id, second);

        assert!(scheduler.cancel_task(&first));
        assert!(!scheduler.cancel_task(&first));
        assert_eq!(scheduler.scheduled_tasks().len(), 1);
    }

    #[tokio::test]
    async fn test_stop_halts_dispatch() {
        let scheduler = Scheduler::with_poll_interval(Duration::from_millis(5));
        let runs = counter();
        let seen = Arc::clone(&runs);

        scheduler.schedule_task(
            move || {
                let seen = Arc::clone(&seen);
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
            Duration::ZERO,
            Some(Duration::from_millis(5)),
            None,
        );

        scheduler.start();
        assert!(scheduler.is_running());
        tokio::time::sleep(Duration::from_millis(40)).await;
        scheduler.stop().await;
        assert!(!scheduler.is_running());

        tokio::time::sleep(Duration::from_millis(20)).await;
        let after_stop = runs.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(runs.load(Ordering::SeqCst), after_stop);
    }
}
