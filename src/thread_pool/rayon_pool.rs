use log::error;

use super::worker::panic_message;
use super::ThreadPool;
use crate::{PoolError, Result};

/// A thread pool backed by `rayon`, used as a work-stealing baseline.
///
/// Unlike [`WorkerPool`](super::WorkerPool), dropping it does not wait for
/// spawned jobs.
pub struct RayonThreadPool {
    pool: rayon::ThreadPool,
}

impl ThreadPool for RayonThreadPool {
    fn new(threads: u32) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads as usize)
            .thread_name(|i| format!("rayon-pool-{i}"))
            .panic_handler(|payload| error!("Rayon job panicked: {}", panic_message(&*payload)))
            .build()
            .map_err(|e| PoolError::Configuration(e.to_string()))?;
        Ok(RayonThreadPool { pool })
    }

    fn spawn<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(job);
        Ok(())
    }
}
