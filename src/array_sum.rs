use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crossbeam::channel;
use log::debug;

use crate::{PoolError, Result, WorkerPool};

/// Sums `nums` on the calling thread.
pub fn sequential(nums: &[i32]) -> i64 {
    nums.iter().map(|&n| i64::from(n)).sum()
}

/// Sums `nums` on `pool`, one chunk per worker.
///
/// Each chunk's completion callback signals a channel; the partial sums are
/// added once every chunk has signalled.
///
/// # Errors
///
/// Fails if the pool is stopped, or with [`PoolError::Disconnected`] if a
/// chunk panicked.
pub fn parallel(pool: &WorkerPool, nums: Arc<[i32]>) -> Result<i64> {
    if nums.is_empty() {
        return Ok(0);
    }

    let chunks = pool.capacity().clamp(1, nums.len());
    let chunk_size = nums.len().div_ceil(chunks);
    let (done_tx, done_rx) = channel::unbounded();
    let mut partials = Vec::with_capacity(chunks);

    for (index, start) in (0..nums.len()).step_by(chunk_size).enumerate() {
        let end = (start + chunk_size).min(nums.len());
        let partial = Arc::new(AtomicI64::new(0));
        partials.push(Arc::clone(&partial));

        let nums = Arc::clone(&nums);
        let done_tx = done_tx.clone();
        pool.submit_with_callback(
            move || partial.store(sequential(&nums[start..end]), Ordering::Relaxed),
            move || {
                let _ = done_tx.send(index);
            },
        )?;
    }
    drop(done_tx);
    debug!("Submitted {} chunks of {chunk_size}", partials.len());

    for _ in 0..partials.len() {
        done_rx.recv().map_err(|_| PoolError::Disconnected)?;
    }
    Ok(partials.iter().map(|p| p.load(Ordering::Relaxed)).sum())
}
