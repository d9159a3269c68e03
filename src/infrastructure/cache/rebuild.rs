//! Bounded worker pool for background cache rebuilds

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Deserialize;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;

use crate::domain::DomainError;
use crate::infrastructure::observability::{RebuildOutcome, record_rebuild};

/// Configuration for the rebuild worker pool
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RebuildSchedulerConfig {
    /// Number of worker tasks; bounds backing-store concurrency caused by refreshes
    pub workers: usize,
    /// Maximum queued tasks before submissions are rejected
    pub queue_capacity: usize,
}

impl Default for RebuildSchedulerConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            queue_capacity: 1024,
        }
    }
}

impl RebuildSchedulerConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }
}

struct RebuildJob {
    name: String,
    task: BoxFuture<'static, Result<(), DomainError>>,
}

/// Fixed-size pool executing fire-and-forget rebuild tasks
///
/// Task errors and panics are logged at the task boundary and never reach the
/// submitter or the dispatch loop. Must be created inside a tokio runtime.
pub struct RebuildScheduler {
    sender: Mutex<Option<mpsc::Sender<RebuildJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    in_flight: Arc<AtomicUsize>,
    idle: Arc<Notify>,
    config: RebuildSchedulerConfig,
}

impl fmt::Debug for RebuildScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RebuildScheduler")
            .field("config", &self.config)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl RebuildScheduler {
    pub fn new(config: RebuildSchedulerConfig) -> Self {
        let workers = config.workers.max(1);
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let idle = Arc::new(Notify::new());

        let handles = (0..workers)
            .map(|worker_id| {
                tokio::spawn(run_worker(
                    worker_id,
                    receiver.clone(),
                    in_flight.clone(),
                    idle.clone(),
                ))
            })
            .collect();

        tracing::info!(
            workers,
            queue_capacity = config.queue_capacity,
            "Rebuild scheduler started"
        );

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(handles),
            in_flight,
            idle,
            config,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(RebuildSchedulerConfig::default())
    }

    pub fn config(&self) -> &RebuildSchedulerConfig {
        &self.config
    }

    /// Queues a task without waiting for it
    ///
    /// Fails with `SchedulerUnavailable` when the queue is full or the
    /// scheduler has been shut down; the task is dropped in that case.
    pub fn submit<F>(&self, name: impl Into<String>, task: F) -> Result<(), DomainError>
    where
        F: Future<Output = Result<(), DomainError>> + Send + 'static,
    {
        let name = name.into();
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .ok_or_else(|| DomainError::scheduler_unavailable("Rebuild scheduler is shut down"))?;

        self.in_flight.fetch_add(1, Ordering::SeqCst);

        let job = RebuildJob {
            name: name.clone(),
            task: task.boxed(),
        };

        match sender.try_send(job) {
            Ok(()) => {
                tracing::debug!(task = %name, "Rebuild task queued");
                Ok(())
            }
            Err(e) => {
                finish_one(&self.in_flight, &self.idle);
                record_rebuild(RebuildOutcome::Rejected);

                let reason = match e {
                    mpsc::error::TrySendError::Full(_) => "queue is full",
                    mpsc::error::TrySendError::Closed(_) => "queue is closed",
                };
                tracing::warn!(task = %name, reason, "Rebuild task rejected");

                Err(DomainError::scheduler_unavailable(format!(
                    "Rebuild task '{}' rejected: {}",
                    name, reason
                )))
            }
        }
    }

    /// Number of tasks queued or running
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Waits until every submitted task has finished
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.in_flight() == 0 {
                return;
            }

            notified.await;
        }
    }

    /// Stops accepting tasks, drains the queue and joins the workers
    pub async fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        drop(sender);

        let handles: Vec<JoinHandle<()>> = std::mem::take(
            &mut *self
                .workers
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Rebuild worker terminated abnormally");
            }
        }

        tracing::info!("Rebuild scheduler shut down");
    }
}

fn finish_one(in_flight: &AtomicUsize, idle: &Notify) {
    if in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
        idle.notify_waiters();
    }
}

async fn run_worker(
    worker_id: usize,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<RebuildJob>>>,
    in_flight: Arc<AtomicUsize>,
    idle: Arc<Notify>,
) {
    loop {
        let job = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };

        let Some(RebuildJob { name, task }) = job else {
            tracing::debug!(worker_id, "Rebuild worker stopping");
            break;
        };

        match AssertUnwindSafe(task).catch_unwind().await {
            Ok(Ok(())) => {
                record_rebuild(RebuildOutcome::Refreshed);
                tracing::debug!(worker_id, task = %name, "Rebuild task completed");
            }
            Ok(Err(e)) => {
                record_rebuild(RebuildOutcome::Failed);
                tracing::warn!(worker_id, task = %name, error = %e, "Rebuild task failed");
            }
            Err(_) => {
                record_rebuild(RebuildOutcome::Panicked);
                tracing::error!(worker_id, task = %name, "Rebuild task panicked");
            }
        }

        finish_one(&in_flight, &idle);
    }
}
