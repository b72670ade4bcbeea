use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::thread::{self, JoinHandle};

use log::{debug, error, info};

use super::queue::{Claim, TaskQueue, WorkItem};
use super::signal::DispatchSignal;

/// State shared between the pool controller and its workers.
pub(crate) struct Shared {
    pub(crate) queue: TaskQueue,
    pub(crate) signal: DispatchSignal,
    pub(crate) idle: AtomicUsize,
    pub(crate) ready: AtomicBool,
    ready_once: Once,
}

impl Shared {
    pub(crate) fn new(queue_limit: Option<usize>) -> Self {
        Shared {
            queue: TaskQueue::new(queue_limit),
            signal: DispatchSignal::new(),
            idle: AtomicUsize::new(0),
            ready: AtomicBool::new(false),
            ready_once: Once::new(),
        }
    }

    fn mark_ready(&self) {
        self.ready_once.call_once(|| {
            self.ready.store(true, Ordering::Release);
            info!("Worker pool ready");
        });
    }
}

/// Spawns worker `id`, named `{prefix}-{id}`.
pub(crate) fn spawn_worker(
    id: usize,
    prefix: &str,
    stack_size: Option<usize>,
    shared: Arc<Shared>,
) -> io::Result<JoinHandle<()>> {
    let mut builder = thread::Builder::new().name(format!("{prefix}-{id}"));
    if let Some(size) = stack_size {
        builder = builder.stack_size(size);
    }
    builder.spawn(move || run(id, &shared))
}

/// The worker loop: wait for a permit, claim one item, run it, repeat until
/// the queue is closed and drained.
fn run(id: usize, shared: &Shared) {
    shared.mark_ready();

    loop {
        shared.idle.fetch_add(1, Ordering::SeqCst);
        shared.signal.acquire();
        shared.idle.fetch_sub(1, Ordering::SeqCst);

        match shared.queue.claim() {
            Claim::Item(item) => execute(id, item),
            Claim::Stop => {
                debug!("Worker {id}: queue drained, shutting down");
                return;
            }
            Claim::Empty => debug!("Worker {id}: woke up to an empty queue"),
        }
    }
}

/// Runs the work and then its completion on this thread. Panics from either
/// are caught so the worker keeps going; the handle learns about them.
fn execute(id: usize, item: WorkItem) {
    let WorkItem {
        work,
        completion,
        reply,
    } = item;
    debug!("Worker {id} executing task");

    let outcome = panic::catch_unwind(AssertUnwindSafe(move || {
        work();
        if let Some(completion) = completion {
            completion();
        }
    }));

    let result = outcome.map_err(|payload| {
        let message = panic_message(&*payload);
        error!("Worker {id} task panicked, continuing: {message}");
        message
    });

    if let Some(reply) = reply {
        // The handle may have been dropped.
        let _ = reply.send(result);
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
