use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crossbeam::channel::Sender;

use super::handle::TaskOutcome;
use crate::{PoolError, Result};

/// A boxed unit of work or completion callback.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// One submission: the work, its optional completion callback and the
/// channel its handle listens on.
pub(crate) struct WorkItem {
    pub(crate) work: Job,
    pub(crate) completion: Option<Job>,
    pub(crate) reply: Option<Sender<TaskOutcome>>,
}

impl WorkItem {
    pub(crate) fn new(work: Job, completion: Option<Job>, reply: Option<Sender<TaskOutcome>>) -> Self {
        WorkItem {
            work,
            completion,
            reply,
        }
    }
}

/// Outcome of a worker's attempt to take an item.
pub(crate) enum Claim {
    /// The front item, now owned by the claiming worker.
    Item(WorkItem),
    /// The queue is closed and empty: the worker should exit.
    Stop,
    /// Nothing queued and still open.
    Empty,
}

struct QueueState {
    items: VecDeque<WorkItem>,
    closed: bool,
}

/// FIFO of pending work items.
///
/// The closed flag lives under the same lock as the items, so a push either
/// lands before `close` (and will be drained) or is rejected.
pub(crate) struct TaskQueue {
    state: Mutex<QueueState>,
    limit: Option<usize>,
}

impl TaskQueue {
    pub(crate) fn new(limit: Option<usize>) -> Self {
        TaskQueue {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
            }),
            limit,
        }
    }

    /// Appends an item, failing if the queue is closed or at its limit.
    pub(crate) fn push(&self, item: WorkItem) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return Err(PoolError::PoolStopped);
        }
        if let Some(limit) = self.limit {
            if state.items.len() >= limit {
                return Err(PoolError::QueueFull { limit });
            }
        }
        state.items.push_back(item);
        Ok(())
    }

    /// Removes the front item.
    pub(crate) fn claim(&self) -> Claim {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match state.items.pop_front() {
            Some(item) => Claim::Item(item),
            None if state.closed => Claim::Stop,
            None => Claim::Empty,
        }
    }

    /// Stops accepting pushes. Returns the number of items left at the
    /// moment of closing, or `None` if already closed.
    pub(crate) fn close(&self) -> Option<usize> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if std::mem::replace(&mut state.closed, true) {
            return None;
        }
        Some(state.items.len())
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closed
    }

    pub(crate) fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .items
            .len()
    }
}
