//! Priority task scheduler with bounded concurrency and retries.
//!
//! The scheduler is generic over the task payload and knows nothing about
//! what a task does; the work is delegated to a [`TaskHandler`]. Pending
//! tasks live in a binary heap ordered by priority and submission order, and
//! a semaphore caps how many run at once.
//!
//! ```rust,ignore
//! let scheduler = TaskScheduler::new(config.scheduler.clone(), handler);
//! scheduler.start();
//! scheduler.submit(Task::new("item-1", item, Priority::High));
//! scheduler.wait_until_drained().await?;
//! ```

mod task;

pub use task::{Priority, Task};

use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, watch, Notify, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use task::Queued;

/// Executes the work behind a task. An `Err` counts as a failed attempt.
#[async_trait]
pub trait TaskHandler<P>: Send + Sync {
    async fn run(&self, task: &Task<P>) -> anyhow::Result<()>;
}

/// Lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchedulerEvent {
    TaskStarted {
        task_id: String,
        attempt: u32,
    },
    TaskCompleted {
        task_id: String,
    },
    TaskFailed {
        task_id: String,
        attempt: u32,
        error: String,
        will_retry: bool,
    },
    QueueDrained,
}

/// Point-in-time counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStatus {
    pub pending: usize,
    pub running: usize,
    pub retrying: usize,
    pub completed: u64,
    pub failed: u64,
    pub is_running: bool,
}

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Scheduler stopped with {0} task(s) outstanding")]
    Stopped(usize),
}

pub struct TaskScheduler<P> {
    inner: Arc<Inner<P>>,
}

impl<P> Clone for TaskScheduler<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<P> {
    config: SchedulerConfig,
    handler: Arc<dyn TaskHandler<P>>,
    queue: Mutex<BinaryHeap<Queued<P>>>,
    semaphore: Arc<Semaphore>,
    wakeup: Notify,
    shutdown: Mutex<CancellationToken>,
    is_running: AtomicBool,
    next_seq: AtomicU64,
    running: AtomicUsize,
    retrying: AtomicUsize,
    completed: AtomicU64,
    failed: AtomicU64,
    /// Tasks not yet completed or dropped: pending + running + retrying.
    outstanding: watch::Sender<usize>,
    events: broadcast::Sender<SchedulerEvent>,
}

impl<P: Send + Sync + 'static> TaskScheduler<P> {
    pub fn new(config: SchedulerConfig, handler: Arc<dyn TaskHandler<P>>) -> Self {
        let (outstanding, _) = watch::channel(0);
        let (events, _) = broadcast::channel(1024);
        let permits = config.max_concurrency.max(1);

        Self {
            inner: Arc::new(Inner {
                config,
                handler,
                queue: Mutex::new(BinaryHeap::new()),
                semaphore: Arc::new(Semaphore::new(permits)),
                wakeup: Notify::new(),
                shutdown: Mutex::new(CancellationToken::new()),
                is_running: AtomicBool::new(false),
                next_seq: AtomicU64::new(0),
                running: AtomicUsize::new(0),
                retrying: AtomicUsize::new(0),
                completed: AtomicU64::new(0),
                failed: AtomicU64::new(0),
                outstanding,
                events,
            }),
        }
    }

    /// Queue a task. Tasks may be submitted before or after [`start`](Self::start).
    pub fn submit(&self, mut task: Task<P>) {
        task.seq = self.inner.next_seq.fetch_add(1, Ordering::SeqCst);
        task.attempt = 0;
        debug!(task_id = %task.id, priority = %task.priority, "Task submitted");

        self.inner.outstanding.send_modify(|n| *n += 1);
        self.inner.queue.lock().push(Queued(task));
        self.inner.wakeup.notify_one();
    }

    /// Spawn the dispatch loop. No-op when already running.
    pub fn start(&self) {
        if self.inner.is_running.swap(true, Ordering::SeqCst) {
            return;
        }
        let token = CancellationToken::new();
        *self.inner.shutdown.lock() = token.clone();

        info!(
            max_concurrency = self.inner.config.max_concurrency,
            max_retries = self.inner.config.max_retries,
            "Task scheduler started"
        );
        tokio::spawn(Arc::clone(&self.inner).dispatch(token));
    }

    /// Stop dispatching. Running tasks finish; pending tasks stay queued.
    pub fn stop(&self) {
        if self.inner.is_running.swap(false, Ordering::SeqCst) {
            self.inner.shutdown.lock().cancel();
            info!("Task scheduler stopped");
        }
    }

    /// Drop every pending task. Returns how many were removed.
    pub fn clear_pending(&self) -> usize {
        let removed = {
            let mut queue = self.inner.queue.lock();
            let n = queue.len();
            queue.clear();
            n
        };
        if removed > 0 {
            self.inner.finish(removed);
        }
        removed
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            pending: self.inner.queue.lock().len(),
            running: self.inner.running.load(Ordering::SeqCst),
            retrying: self.inner.retrying.load(Ordering::SeqCst),
            completed: self.inner.completed.load(Ordering::SeqCst),
            failed: self.inner.failed.load(Ordering::SeqCst),
            is_running: self.inner.is_running.load(Ordering::SeqCst),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.inner.events.subscribe()
    }

    /// Resolve once nothing is pending, running or waiting for a retry.
    ///
    /// Fails if the scheduler is stopped while work is still outstanding.
    pub async fn wait_until_drained(&self) -> Result<(), SchedulerError> {
        let mut outstanding = self.inner.outstanding.subscribe();
        let shutdown = self.inner.shutdown.lock().clone();

        let drained = async move {
            // The sender lives in `inner`, so the channel cannot close here.
            let _ = outstanding.wait_for(|n| *n == 0).await.map(|_| ());
        };

        tokio::select! {
            biased;
            _ = drained => Ok(()),
            _ = shutdown.cancelled() => {
                Err(SchedulerError::Stopped(*self.inner.outstanding.borrow()))
            }
        }
    }
}

impl<P: Send + Sync + 'static> Inner<P> {
    async fn dispatch(self: Arc<Self>, shutdown: CancellationToken) {
        loop {
            let permit = tokio::select! {
                permit = Arc::clone(&self.semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = shutdown.cancelled() => break,
            };

            let task = loop {
                let next = self.queue.lock().pop();
                if let Some(Queued(task)) = next {
                    break Some(task);
                }
                tokio::select! {
                    _ = self.wakeup.notified() => {}
                    _ = shutdown.cancelled() => break None,
                }
            };

            let Some(task) = task else { break };
            tokio::spawn(Arc::clone(&self).execute(task, permit));
        }
        debug!("Dispatch loop exited");
    }

    async fn execute(self: Arc<Self>, mut task: Task<P>, permit: OwnedSemaphorePermit) {
        self.running.fetch_add(1, Ordering::SeqCst);
        let _ = self.events.send(SchedulerEvent::TaskStarted {
            task_id: task.id.clone(),
            attempt: task.attempt + 1,
        });

        let result = self.handler.run(&task).await;

        self.running.fetch_sub(1, Ordering::SeqCst);
        drop(permit);

        match result {
            Ok(()) => {
                self.completed.fetch_add(1, Ordering::SeqCst);
                debug!(task_id = %task.id, "Task completed");
                let _ = self.events.send(SchedulerEvent::TaskCompleted {
                    task_id: task.id.clone(),
                });
                self.finish(1);
            }
            Err(e) => {
                task.attempt += 1;
                let max_attempts = task.max_attempts.unwrap_or(self.config.max_retries);
                let will_retry = task.attempt < max_attempts;

                warn!(
                    task_id = %task.id,
                    attempt = task.attempt,
                    max_attempts,
                    will_retry,
                    error = %e,
                    "Task failed"
                );
                let _ = self.events.send(SchedulerEvent::TaskFailed {
                    task_id: task.id.clone(),
                    attempt: task.attempt,
                    error: format!("{e:#}"),
                    will_retry,
                });

                if will_retry {
                    self.retrying.fetch_add(1, Ordering::SeqCst);
                    let delay = Duration::from_millis(self.config.retry_delay_ms);
                    tokio::spawn(Arc::clone(&self).requeue(task, delay));
                } else {
                    self.failed.fetch_add(1, Ordering::SeqCst);
                    self.finish(1);
                }
            }
        }
    }

    async fn requeue(self: Arc<Self>, task: Task<P>, delay: Duration) {
        tokio::time::sleep(delay).await;
        self.retrying.fetch_sub(1, Ordering::SeqCst);
        self.queue.lock().push(Queued(task));
        self.wakeup.notify_one();
    }

    fn finish(&self, count: usize) {
        let mut drained = false;
        self.outstanding.send_modify(|n| {
            *n = n.saturating_sub(count);
            drained = *n == 0;
        });
        if drained {
            debug!("Task queue drained");
            let _ = self.events.send(SchedulerEvent::QueueDrained);
        }
    }
}
