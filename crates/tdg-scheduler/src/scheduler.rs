//! Worker pool over the priority queue
//!
//! One dispatch loop pops the next task only after a worker permit is
//! free, so at most `workers` tasks run at once. Tasks run on their own
//! tokio tasks; a panic is captured as [`TaskExecutionError::Panicked`]
//! and never reaches the dispatch loop. Terminal outcomes are retained for
//! the configured window and then purged.

use crate::error::{SchedulerError, TaskExecutionError};
use crate::progress::{ProgressEvent, ProgressSink, TaskSink};
use crate::queue::TaskQueue;
use crate::task::{Priority, TaskId, TaskOutcome, TaskRecord, TaskState};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::FutureExt;
use moka::future::Cache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

/// Scheduler sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Concurrent workers
    pub workers: usize,
    /// Most queued tasks before submissions are rejected
    pub queue_capacity: usize,
    /// How long terminal outcomes stay queryable
    pub retention: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 100,
            retention: Duration::from_secs(3600),
        }
    }
}

impl SchedulerConfig {
    /// Set the worker count
    #[inline]
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the queue capacity
    #[inline]
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the retention window
    #[inline]
    #[must_use]
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }
}

/// Work executed for each task
#[async_trait]
pub trait TaskRunner: Send + Sync + 'static {
    /// Submitted input
    type Payload: Send + 'static;
    /// Retained output
    type Output: Clone + Send + Sync + 'static;

    /// Run one task, reporting stage boundaries to `progress`.
    ///
    /// Failure events are emitted by the scheduler.
    async fn run(
        &self,
        task_id: TaskId,
        payload: Self::Payload,
        progress: &dyn ProgressSink,
    ) -> Result<Self::Output, TaskExecutionError>;
}

/// Counters and gauges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Admitted submissions
    pub submitted: u64,
    /// Tasks that completed
    pub completed: u64,
    /// Tasks that failed, including abandoned ones
    pub failed: u64,
    /// Submissions rejected by a full queue
    pub rejected: u64,
    /// Tasks waiting for a worker
    pub queued: usize,
    /// Tasks held by a worker
    pub running: usize,
    /// Worker pool size
    pub workers: usize,
    /// Queue capacity
    pub queue_capacity: usize,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
    running: AtomicUsize,
}

struct Pending<P> {
    id: TaskId,
    payload: P,
    sink: Arc<dyn ProgressSink>,
}

struct Shared<R: TaskRunner> {
    runner: R,
    config: SchedulerConfig,
    queue: Mutex<TaskQueue<Pending<R::Payload>>>,
    live: DashMap<TaskId, TaskRecord>,
    finished: Cache<TaskId, TaskOutcome<R::Output>>,
    wakeup: Notify,
    done: Notify,
    permits: Arc<Semaphore>,
    counters: Counters,
    shutdown: watch::Sender<bool>,
}

impl<R: TaskRunner> Shared<R> {
    fn start(&self, id: TaskId) -> Result<(), SchedulerError> {
        let mut record = self.live.get_mut(&id).ok_or(SchedulerError::NotFound(id))?;
        record.transition(TaskState::Running)
    }

    async fn finish(&self, id: TaskId, output: Result<R::Output, TaskExecutionError>) {
        let to = if output.is_ok() {
            TaskState::Completed
        } else {
            TaskState::Failed
        };
        let record = {
            let Some(mut record) = self.live.get_mut(&id) else {
                tracing::error!(task_id = %id, "finished task has no record");
                return;
            };
            if let Err(error) = record.transition(to) {
                tracing::error!(task_id = %id, %error, "rejected transition");
                return;
            }
            record.error = output.as_ref().err().cloned();
            record.clone()
        };

        match &output {
            Ok(_) => {
                self.counters.completed.fetch_add(1, Ordering::Relaxed);
                tracing::info!(task_id = %id, "task completed");
            }
            Err(error) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(task_id = %id, %error, "task failed");
            }
        }

        // Publish before removing so status never sees a gap
        self.finished.insert(id, TaskOutcome { record, output }).await;
        self.live.remove(&id);
        self.done.notify_waiters();
    }
}

/// Priority scheduler for generation tasks
pub struct GenerationScheduler<R: TaskRunner> {
    shared: Arc<Shared<R>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl<R: TaskRunner> std::fmt::Debug for GenerationScheduler<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationScheduler")
            .field("config", &self.shared.config)
            .field("live", &self.shared.live.len())
            .finish_non_exhaustive()
    }
}

impl<R: TaskRunner> GenerationScheduler<R> {
    /// Start a scheduler and its dispatch loop.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    #[must_use]
    pub fn new(runner: R, config: SchedulerConfig) -> Self {
        let workers = config.workers.max(1);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let shared = Arc::new(Shared {
            runner,
            config,
            queue: Mutex::new(TaskQueue::new(config.queue_capacity)),
            live: DashMap::new(),
            finished: Cache::builder().time_to_live(config.retention).build(),
            wakeup: Notify::new(),
            done: Notify::new(),
            permits: Arc::new(Semaphore::new(workers)),
            counters: Counters::default(),
            shutdown,
        });
        let dispatcher = tokio::spawn(dispatch(Arc::clone(&shared), shutdown_rx));
        tracing::info!(
            workers,
            queue_capacity = config.queue_capacity,
            retention_secs = config.retention.as_secs(),
            "scheduler started"
        );
        Self {
            shared,
            dispatcher: Mutex::new(Some(dispatcher)),
        }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// The task runner
    #[inline]
    #[must_use]
    pub fn runner(&self) -> &R {
        &self.shared.runner
    }

    /// Queue a task without blocking
    ///
    /// # Errors
    ///
    /// [`SchedulerError::QueueFull`] when the queue is at capacity, and
    /// [`SchedulerError::ShutDown`] after [`shutdown`](Self::shutdown).
    pub fn submit(
        &self,
        payload: R::Payload,
        priority: Priority,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<TaskId, SchedulerError> {
        if *self.shared.shutdown.borrow() {
            return Err(SchedulerError::ShutDown);
        }
        let id = TaskId::new();
        {
            let mut queue = self.shared.queue.lock();
            // Shutdown raises the flag under this lock before draining
            if *self.shared.shutdown.borrow() {
                return Err(SchedulerError::ShutDown);
            }
            let sequence = match queue.push_with(priority, |_| Pending { id, payload, sink }) {
                Ok(sequence) => sequence,
                Err(full) => {
                    self.shared.counters.rejected.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(capacity = full.capacity, priority = priority.as_str(), "queue full, rejecting task");
                    return Err(full.into());
                }
            };
            // Recorded under the queue lock so the dispatcher never pops an unknown task
            self.shared.live.insert(id, TaskRecord::queued(id, priority, sequence));
        }
        self.shared.counters.submitted.fetch_add(1, Ordering::Relaxed);
        tracing::info!(task_id = %id, priority = priority.as_str(), "task queued");
        self.shared.wakeup.notify_one();
        Ok(id)
    }

    /// Current status, or `None` for unknown and purged tasks
    pub async fn status(&self, id: TaskId) -> Option<TaskRecord> {
        let live = self.shared.live.get(&id).map(|record| record.value().clone());
        match live {
            Some(record) => Some(record),
            None => self.shared.finished.get(&id).await.map(|outcome| outcome.record),
        }
    }

    /// Terminal outcome, or `None` while running and after purge
    pub async fn outcome(&self, id: TaskId) -> Option<TaskOutcome<R::Output>> {
        self.shared.finished.get(&id).await
    }

    /// Wait up to `timeout` for a task to finish
    ///
    /// # Errors
    ///
    /// [`SchedulerError::NotFound`] for unknown or purged tasks and
    /// [`SchedulerError::Timeout`] when the task is still live.
    pub async fn wait(&self, id: TaskId, timeout: Duration) -> Result<TaskOutcome<R::Output>, SchedulerError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.shared.done.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(outcome) = self.shared.finished.get(&id).await {
                return Ok(outcome);
            }
            if !self.shared.live.contains_key(&id) {
                return self
                    .shared
                    .finished
                    .get(&id)
                    .await
                    .ok_or(SchedulerError::NotFound(id));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Err(SchedulerError::Timeout {
                    task_id: id,
                    waited: timeout,
                });
            }
        }
    }

    /// Snapshot of counters and gauges
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        let counters = &self.shared.counters;
        SchedulerStats {
            submitted: counters.submitted.load(Ordering::Relaxed),
            completed: counters.completed.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            rejected: counters.rejected.load(Ordering::Relaxed),
            queued: self.shared.queue.lock().len(),
            running: counters.running.load(Ordering::Relaxed),
            workers: self.shared.config.workers.max(1),
            queue_capacity: self.shared.config.queue_capacity,
        }
    }

    /// Stop dispatching, fail queued tasks and wait for running ones
    pub async fn shutdown(&self) {
        let already = {
            let _queue = self.shared.queue.lock();
            self.shared.shutdown.send_replace(true)
        };
        if already {
            return;
        }
        let dispatcher = self.dispatcher.lock().take();
        if let Some(handle) = dispatcher {
            if let Err(error) = handle.await {
                tracing::error!(%error, "dispatcher ended abnormally");
            }
        }

        let abandoned = self.shared.queue.lock().drain_ordered();
        for task in abandoned {
            let progress = TaskSink::new(task.id.to_string(), task.sink.as_ref());
            progress.emit(ProgressEvent::error(TaskExecutionError::Abandoned.to_string()));
            self.shared.finish(task.id, Err(TaskExecutionError::Abandoned)).await;
        }

        let workers = u32::try_from(self.shared.config.workers.max(1)).unwrap_or(u32::MAX);
        if self.shared.permits.acquire_many(workers).await.is_err() {
            tracing::warn!("worker permits closed during shutdown");
        }
        tracing::info!("scheduler stopped");
    }
}

impl<R: TaskRunner> Drop for GenerationScheduler<R> {
    fn drop(&mut self) {
        self.shared.shutdown.send_replace(true);
    }
}

async fn dispatch<R: TaskRunner>(shared: Arc<Shared<R>>, mut shutdown: watch::Receiver<bool>) {
    loop {
        let permit = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            permit = Arc::clone(&shared.permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let next = loop {
            let popped = shared.queue.lock().pop();
            if let Some(task) = popped {
                break Some(task);
            }
            tokio::select! {
                biased;
                _ = shutdown.changed() => break None,
                () = shared.wakeup.notified() => {}
            }
        };
        let Some(task) = next else { break };
        tokio::spawn(run_task(Arc::clone(&shared), task, permit));
    }
    tracing::debug!("dispatcher stopped");
}

async fn run_task<R: TaskRunner>(shared: Arc<Shared<R>>, task: Pending<R::Payload>, permit: OwnedSemaphorePermit) {
    let _permit = permit;
    let Pending { id, payload, sink } = task;
    if let Err(error) = shared.start(id) {
        tracing::error!(task_id = %id, %error, "cannot start task");
        return;
    }
    shared.counters.running.fetch_add(1, Ordering::Relaxed);
    tracing::info!(task_id = %id, "task started");

    let progress = TaskSink::new(id.to_string(), sink.as_ref());
    let output = match AssertUnwindSafe(shared.runner.run(id, payload, &progress))
        .catch_unwind()
        .await
    {
        Ok(output) => output,
        Err(panic) => Err(TaskExecutionError::Panicked(panic_message(&*panic))),
    };
    if let Err(error) = &output {
        progress.emit(ProgressEvent::error(error.to_string()));
    }

    shared.counters.running.fetch_sub(1, Ordering::Relaxed);
    shared.finish(id, output).await;
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopSink;
    use pretty_assertions::assert_eq;

    struct Echo;

    #[async_trait]
    impl TaskRunner for Echo {
        type Payload = u32;
        type Output = u32;

        async fn run(&self, _id: TaskId, payload: u32, _progress: &dyn ProgressSink) -> Result<u32, TaskExecutionError> {
            match payload {
                0 => Err(TaskExecutionError::failed("zero")),
                13 => panic!("unlucky"),
                n => Ok(n * 2),
            }
        }
    }

    #[tokio::test]
    async fn test_outcomes() {
        let scheduler = GenerationScheduler::new(Echo, SchedulerConfig::default());
        let ok = scheduler.submit(21, Priority::Normal, Arc::new(NoopSink)).unwrap();
        let bad = scheduler.submit(0, Priority::Normal, Arc::new(NoopSink)).unwrap();
        let boom = scheduler.submit(13, Priority::Normal, Arc::new(NoopSink)).unwrap();

        let wait = Duration::from_secs(5);
        assert_eq!(scheduler.wait(ok, wait).await.unwrap().output, Ok(42));
        let failed = scheduler.wait(bad, wait).await.unwrap();
        assert_eq!(failed.record.state, TaskState::Failed);
        let panicked = scheduler.wait(boom, wait).await.unwrap();
        assert_eq!(panicked.output, Err(TaskExecutionError::Panicked("unlucky".into())));

        let stats = scheduler.stats();
        assert_eq!((stats.submitted, stats.completed, stats.failed), (3, 1, 2));
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_unknown_task() {
        let scheduler = GenerationScheduler::new(Echo, SchedulerConfig::default());
        assert!(scheduler.status(TaskId::new()).await.is_none());
        let err = scheduler.wait(TaskId::new(), Duration::from_millis(10)).await.unwrap_err();
        assert!(err.is_not_found());
        scheduler.shutdown().await;
        let err = scheduler.submit(1, Priority::High, Arc::new(NoopSink)).unwrap_err();
        assert!(matches!(err, SchedulerError::ShutDown));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*payload), "owned");
    }
}
