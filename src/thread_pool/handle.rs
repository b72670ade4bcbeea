use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::{PoolError, Result};

/// What a worker reports for one item: `Err` carries the panic message.
pub(crate) type TaskOutcome = std::result::Result<(), String>;

#[derive(Debug, Clone)]
enum Settled {
    Completed,
    Panicked(String),
    Disconnected,
}

impl Settled {
    fn to_result(&self) -> Result<()> {
        match self {
            Settled::Completed => Ok(()),
            Settled::Panicked(message) => Err(PoolError::TaskPanicked(message.clone())),
            Settled::Disconnected => Err(PoolError::Disconnected),
        }
    }
}

impl From<TaskOutcome> for Settled {
    fn from(outcome: TaskOutcome) -> Self {
        match outcome {
            Ok(()) => Settled::Completed,
            Err(message) => Settled::Panicked(message),
        }
    }
}

/// A handle to one submitted work item.
///
/// Resolves once the item's work and completion callback have run. The item
/// runs whether or not the handle is kept. Once resolved, every further
/// check reports the same result.
#[derive(Debug)]
pub struct TaskHandle {
    rx: Receiver<TaskOutcome>,
    done: Option<Settled>,
}

impl TaskHandle {
    pub(crate) fn pair() -> (Sender<TaskOutcome>, TaskHandle) {
        let (tx, rx) = channel::bounded(1);
        (tx, TaskHandle { rx, done: None })
    }

    /// Blocks until the item has been processed.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::TaskPanicked`] if the work or its completion
    /// panicked.
    pub fn wait(self) -> Result<()> {
        match self.done {
            Some(done) => done.to_result(),
            None => self
                .rx
                .recv()
                .map_or(Settled::Disconnected, Settled::from)
                .to_result(),
        }
    }

    /// Like [`wait`](Self::wait), but gives up after `timeout`.
    ///
    /// A timed-out handle can be waited on again.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Result<()> {
        if self.done.is_none() {
            match self.rx.recv_timeout(timeout) {
                Ok(outcome) => self.done = Some(outcome.into()),
                Err(RecvTimeoutError::Timeout) => return Err(PoolError::Timeout),
                Err(RecvTimeoutError::Disconnected) => self.done = Some(Settled::Disconnected),
            }
        }
        self.done.as_ref().map_or(Err(PoolError::Timeout), Settled::to_result)
    }

    /// Returns `true` once the item has been processed, without blocking.
    pub fn is_finished(&mut self) -> bool {
        if self.done.is_none() {
            match self.rx.try_recv() {
                Ok(outcome) => self.done = Some(outcome.into()),
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => self.done = Some(Settled::Disconnected),
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::TaskHandle;
    use crate::PoolError;
    use std::time::Duration;

    #[test]
    fn finished_result_is_kept_for_wait() {
        let (tx, mut handle) = TaskHandle::pair();
        assert!(!handle.is_finished());

        tx.send(Err("boom".to_owned())).unwrap();
        assert!(handle.is_finished());
        assert!(handle.is_finished());
        assert!(matches!(handle.wait(), Err(PoolError::TaskPanicked(msg)) if msg == "boom"));
    }

    #[test]
    fn timeout_then_success() {
        let (tx, mut handle) = TaskHandle::pair();
        assert!(matches!(
            handle.wait_timeout(Duration::from_millis(10)),
            Err(PoolError::Timeout)
        ));
        tx.send(Ok(())).unwrap();
        assert!(handle.wait_timeout(Duration::from_millis(10)).is_ok());
    }

    #[test]
    fn success_is_reported_on_every_check() {
        let (tx, mut handle) = TaskHandle::pair();
        tx.send(Ok(())).unwrap();
        drop(tx);

        assert!(handle.wait_timeout(Duration::from_secs(5)).is_ok());
        assert!(handle.wait_timeout(Duration::from_millis(1)).is_ok());
        assert!(handle.is_finished());
        assert!(handle.wait().is_ok());
    }

    #[test]
    fn panic_is_reported_on_every_check() {
        let (tx, mut handle) = TaskHandle::pair();
        tx.send(Err("bad".to_owned())).unwrap();
        drop(tx);

        assert!(handle.is_finished());
        assert!(matches!(
            handle.wait_timeout(Duration::from_millis(1)),
            Err(PoolError::TaskPanicked(_))
        ));
        assert!(matches!(handle.wait(), Err(PoolError::TaskPanicked(msg)) if msg == "bad"));
    }

    #[test]
    fn dropped_sender_reports_disconnect() {
        let (tx, handle) = TaskHandle::pair();
        drop(tx);
        assert!(matches!(handle.wait(), Err(PoolError::Disconnected)));
    }
}
