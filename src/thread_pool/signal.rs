use std::sync::{Condvar, Mutex, PoisonError};

/// A counting semaphore used to wake workers.
///
/// Every `release` adds permits to a counter guarded by the same mutex the
/// waiters check, so a permit posted while nobody is waiting is banked and
/// consumed by the next `acquire` instead of being lost.
#[derive(Debug, Default)]
pub(crate) struct DispatchSignal {
    permits: Mutex<usize>,
    available: Condvar,
}

impl DispatchSignal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds `n` permits, waking up to `n` blocked acquirers.
    pub(crate) fn release(&self, n: usize) {
        if n == 0 {
            return;
        }
        let mut permits = self.permits.lock().unwrap_or_else(PoisonError::into_inner);
        *permits = permits.saturating_add(n);
        drop(permits);

        if n == 1 {
            self.available.notify_one();
        } else {
            self.available.notify_all();
        }
    }

    /// Blocks until a permit is available, then consumes it.
    pub(crate) fn acquire(&self) {
        let mut permits = self.permits.lock().unwrap_or_else(PoisonError::into_inner);
        while *permits == 0 {
            permits = self
                .available
                .wait(permits)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *permits -= 1;
    }

    /// Consumes a permit if one is banked, without blocking.
    #[cfg(test)]
    pub(crate) fn try_acquire(&self) -> bool {
        let mut permits = self.permits.lock().unwrap_or_else(PoisonError::into_inner);
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    /// Number of banked permits.
    #[cfg(test)]
    pub(crate) fn available(&self) -> usize {
        *self.permits.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
