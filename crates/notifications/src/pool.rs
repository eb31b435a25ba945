//! Bounded worker pool for notification jobs.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::{BoxFuture, join_all};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::error::{NotificationError, Result};

/// A unit of work run by the pool.
pub type Job = BoxFuture<'static, ()>;

/// Fixed set of workers draining a bounded queue.
///
/// Submitting never waits: when the queue is full the job is handed back as
/// [`NotificationError::QueueFull`] and the caller decides what to log.
pub struct WorkerPool {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Spawns `workers` tasks sharing a queue of `queue_capacity` jobs.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(workers: usize, queue_capacity: usize) -> Self {
        let workers = workers.max(1);
        let (sender, receiver) = mpsc::channel::<Job>(queue_capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let handles = (0..workers)
            .map(|worker| tokio::spawn(run_worker(worker, Arc::clone(&receiver))))
            .collect();

        tracing::info!(workers, queue_capacity, "notification pool started");

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(handles),
        }
    }

    /// Queues a job without waiting.
    pub fn submit(&self, job: Job) -> Result<()> {
        let guard = self
            .sender
            .lock()
            .map_err(|_| NotificationError::ShutDown)?;
        let sender = guard.as_ref().ok_or(NotificationError::ShutDown)?;

        sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => NotificationError::QueueFull,
            TrySendError::Closed(_) => NotificationError::ShutDown,
        })
    }

    /// Stops accepting work and waits up to `grace` for queued jobs to finish.
    ///
    /// Workers still busy after `grace` are aborted. Calling this twice is a no-op.
    pub async fn shutdown(&self, grace: Duration) {
        // Dropping the sender lets workers drain the queue and then exit.
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
        let handles = match self.workers.lock() {
            Ok(mut workers) => std::mem::take(&mut *workers),
            Err(_) => return,
        };
        if handles.is_empty() {
            return;
        }

        let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();
        match tokio::time::timeout(grace, join_all(handles)).await {
            Ok(_) => tracing::info!("notification pool drained"),
            Err(_) => {
                tracing::warn!(
                    grace_secs = grace.as_secs(),
                    "notification pool did not drain in time, aborting workers"
                );
                for abort in aborts {
                    abort.abort();
                }
            }
        }
    }
}

async fn run_worker(worker: usize, receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>) {
    loop {
        // The lock is held only while waiting for the next job.
        let job = receiver.lock().await.recv().await;
        match job {
            Some(job) => job.await,
            None => break,
        }
    }
    tracing::debug!(worker, "notification worker stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::oneshot;

    use super::*;

    #[tokio::test]
    async fn test_runs_submitted_jobs() {
        let pool = WorkerPool::new(2, 10);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let counter = Arc::clone(&counter);
            pool.submit(Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        }

        pool.shutdown(Duration::from_secs(5)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_full_queue_rejects_without_waiting() {
        let pool = WorkerPool::new(1, 1);
        let (release, gate) = oneshot::channel::<()>();
        let (started_tx, started) = oneshot::channel::<()>();

        // Occupy the only worker
        pool.submit(Box::pin(async move {
            let _ = started_tx.send(());
            let _ = gate.await;
        }))
        .unwrap();
        started.await.unwrap();

        // Fill the queue
        pool.submit(Box::pin(async {})).unwrap();

        let rejected = pool.submit(Box::pin(async {}));
        assert!(matches!(rejected, Err(NotificationError::QueueFull)));

        release.send(()).unwrap();
        pool.shutdown(Duration::from_secs(5)).await;
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_fails() {
        let pool = WorkerPool::new(1, 1);
        pool.shutdown(Duration::from_secs(1)).await;
        pool.shutdown(Duration::from_secs(1)).await;

        let result = pool.submit(Box::pin(async {}));
        assert!(matches!(result, Err(NotificationError::ShutDown)));
    }

    #[tokio::test]
    async fn test_shutdown_aborts_stuck_jobs_after_grace() {
        let pool = WorkerPool::new(1, 1);
        pool.submit(Box::pin(std::future::pending::<()>())).unwrap();

        let started = std::time::Instant::now();
        pool.shutdown(Duration::from_millis(50)).await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
