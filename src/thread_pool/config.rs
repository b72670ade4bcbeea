use crate::{PoolError, Result, WorkerPool};

/// Largest number of workers a pool may be built with.
pub const MAX_CAPACITY: usize = 4096;

const DEFAULT_THREAD_NAME: &str = "worker-pool";

/// Settings for building a [`WorkerPool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of workers; 0 means one per available CPU.
    pub capacity: usize,
    /// Prefix for worker thread names.
    pub thread_name: String,
    /// Maximum number of queued items, or `None` for an unbounded queue.
    pub queue_limit: Option<usize>,
    /// Stack size for worker threads, or `None` for the platform default.
    pub stack_size: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            capacity: 0,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
            queue_limit: None,
            stack_size: None,
        }
    }
}

impl PoolConfig {
    /// Sets the number of workers.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the worker thread name prefix.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Bounds the queue; submissions past the limit fail with
    /// [`PoolError::QueueFull`].
    pub fn queue_limit(mut self, limit: usize) -> Self {
        self.queue_limit = Some(limit);
        self
    }

    /// Sets the worker stack size in bytes.
    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    /// Builds and starts the pool.
    pub fn build(self) -> Result<WorkerPool> {
        WorkerPool::with_config(self)
    }

    /// Checks the settings and returns the effective worker count.
    pub(crate) fn resolve_capacity(&self) -> Result<usize> {
        if self.thread_name.is_empty() || self.thread_name.contains('\0') {
            return Err(PoolError::Configuration(format!(
                "invalid thread name {:?}",
                self.thread_name
            )));
        }
        if self.queue_limit == Some(0) {
            return Err(PoolError::Configuration(
                "queue limit must be at least 1".to_owned(),
            ));
        }

        let capacity = match self.capacity {
            0 => num_cpus::get(),
            n => n,
        };
        if capacity > MAX_CAPACITY {
            return Err(PoolError::InvalidCapacity {
                requested: capacity,
                max: MAX_CAPACITY,
            });
        }
        Ok(capacity)
    }
}
