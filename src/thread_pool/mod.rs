use crate::Result;

/// A thread pool for executing jobs concurrently.
///
/// Lets benchmarks and callers swap the [`WorkerPool`] for other
/// implementations.
pub trait ThreadPool {
    /// Creates a new thread pool with the given number of threads.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created (e.g., invalid size).
    fn new(threads: u32) -> Result<Self>
    where
        Self: Sized;

    /// Spawns a function into the thread pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool no longer accepts work.
    fn spawn<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static;
}

mod config;
mod handle;
mod queue;
mod rayon_pool;
mod signal;
mod worker;
mod worker_pool;

pub use self::config::{PoolConfig, MAX_CAPACITY};
pub use self::handle::TaskHandle;
pub use self::rayon_pool::RayonThreadPool;
pub use self::worker_pool::WorkerPool;
