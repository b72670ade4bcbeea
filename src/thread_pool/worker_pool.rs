use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

use log::{error, info, warn};

use super::config::PoolConfig;
use super::handle::TaskHandle;
use super::queue::{Job, WorkItem};
use super::worker::{self, Shared};
use super::ThreadPool;
use crate::Result;

/// A fixed-size pool of worker threads fed from one FIFO queue.
///
/// Shutting the pool down, explicitly or by dropping it, stops new
/// submissions and blocks until every item already queued has run.
pub struct WorkerPool {
    shared: Arc<Shared>,
    capacity: usize,
    worker_ids: Vec<ThreadId>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Starts a pool with `capacity` workers, or one per CPU if 0.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidCapacity`](crate::PoolError::InvalidCapacity)
    /// above [`MAX_CAPACITY`](crate::MAX_CAPACITY) and an IO error if a
    /// thread cannot be spawned.
    pub fn new(capacity: usize) -> Result<Self> {
        PoolConfig::default().capacity(capacity).build()
    }

    /// Starts a pool from a [`PoolConfig`].
    ///
    /// Returns once the threads are spawned, not once they are ready; poll
    /// [`is_ready`](Self::is_ready) if that matters.
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        let capacity = config.resolve_capacity()?;
        let shared = Arc::new(Shared::new(config.queue_limit));

        let mut workers = Vec::with_capacity(capacity);
        for id in 0..capacity {
            match worker::spawn_worker(
                id,
                &config.thread_name,
                config.stack_size,
                Arc::clone(&shared),
            ) {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    error!("Failed to spawn worker {id}: {e}");
                    shared.queue.close();
                    shared.signal.release(workers.len());
                    for handle in workers {
                        join_worker(handle);
                    }
                    return Err(e.into());
                }
            }
        }

        info!(
            "Started worker pool '{}' with {capacity} workers",
            config.thread_name
        );
        let worker_ids = workers.iter().map(|h| h.thread().id()).collect();
        Ok(WorkerPool {
            shared,
            capacity,
            worker_ids,
            workers: Mutex::new(workers),
        })
    }

    /// Queues `work` for execution.
    ///
    /// Never waits for a free worker. Fails with
    /// [`PoolError::PoolStopped`](crate::PoolError::PoolStopped) once shutdown
    /// has begun.
    pub fn submit<F>(&self, work: F) -> Result<TaskHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(Box::new(work), None)
    }

    /// Queues `work`, running `completion` on the same worker right after it.
    ///
    /// `completion` is skipped if `work` panics.
    pub fn submit_with_callback<F, C>(&self, work: F, completion: C) -> Result<TaskHandle>
    where
        F: FnOnce() + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        self.enqueue(Box::new(work), Some(Box::new(completion)))
    }

    fn enqueue(&self, work: Job, completion: Option<Job>) -> Result<TaskHandle> {
        let (reply, handle) = TaskHandle::pair();
        self.push(WorkItem::new(work, completion, Some(reply)))?;
        Ok(handle)
    }

    fn push(&self, item: WorkItem) -> Result<()> {
        if let Err(e) = self.shared.queue.push(item) {
            warn!("Rejected task: {e}");
            return Err(e);
        }
        self.shared.signal.release(1);
        Ok(())
    }

    /// Stops accepting work, runs everything still queued and joins the
    /// workers.
    ///
    /// Idempotent. A concurrent second caller blocks until the workers are
    /// joined. Called from one of this pool's own workers, it only stops
    /// the pool and returns without joining.
    pub fn shutdown(&self) {
        if let Some(pending) = self.shared.queue.close() {
            info!("Shutting down worker pool, {pending} tasks left to drain");
            self.shared.signal.release(self.capacity);
        }

        if self.worker_ids.contains(&thread::current().id()) {
            warn!("Worker pool shut down from its own worker; not joining workers");
            return;
        }

        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        for handle in workers.drain(..) {
            join_worker(handle);
        }
    }

    /// Number of worker threads.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of workers currently waiting for work.
    pub fn idle_workers(&self) -> usize {
        self.shared.idle.load(Ordering::SeqCst)
    }

    /// Number of items queued and not yet claimed.
    pub fn queued_tasks(&self) -> usize {
        self.shared.queue.len()
    }

    /// Whether a worker has started and at least one is idle.
    ///
    /// A snapshot for diagnostics; it may be stale by the time it returns.
    pub fn is_ready(&self) -> bool {
        self.shared.ready.load(Ordering::Acquire) && self.idle_workers() > 0
    }

    /// Whether every worker is started and idle. Also only a snapshot.
    pub fn are_workers_idle(&self) -> bool {
        self.shared.ready.load(Ordering::Acquire) && self.idle_workers() == self.capacity
    }

    /// Whether shutdown has begun.
    pub fn is_stopped(&self) -> bool {
        self.shared.queue.is_closed()
    }
}

fn join_worker(handle: JoinHandle<()>) {
    let name = handle.thread().name().unwrap_or("<unnamed>").to_owned();
    if handle.join().is_err() {
        error!("Worker thread {name} exited abnormally");
    }
}

impl ThreadPool for WorkerPool {
    fn new(threads: u32) -> Result<Self> {
        WorkerPool::new(threads as usize)
    }

    fn spawn<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.push(WorkItem::new(Box::new(job), None, None))
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
