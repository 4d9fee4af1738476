//! Execution contexts for the Dispatch operator.
//!
//! A dispatcher accepts units of work and runs each exactly once, in the order
//! they were posted, on some other context. `ChannelDispatcher` hands units to a
//! `WorkQueue` over a crossbeam channel; the queue's owner decides which thread
//! drains it.
//!
//! Posting never blocks: a Dispatch operator posts while the upstream write
//! guard is held, so the channel is always unbounded.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

/// One deferred effect posted by a Dispatch operator.
pub type WorkUnit = Box<dyn FnOnce() + Send>;

pub trait Dispatcher: Send + Sync {
    /// Post `unit` for later execution. Units must run in post order.
    fn dispatch(&self, unit: WorkUnit);
}

pub type SharedDispatcher = Arc<dyn Dispatcher>;

/// Create a dispatcher/queue pair over an unbounded channel.
pub fn channel() -> (ChannelDispatcher, WorkQueue) {
    let (tx, rx) = unbounded();
    (ChannelDispatcher { tx }, WorkQueue { rx })
}

/// Sending half: posts units into the channel.
#[derive(Clone)]
pub struct ChannelDispatcher {
    tx: Sender<WorkUnit>,
}

impl ChannelDispatcher {
    pub fn shared(self) -> SharedDispatcher {
        Arc::new(self)
    }
}

impl Dispatcher for ChannelDispatcher {
    fn dispatch(&self, unit: WorkUnit) {
        if self.tx.send(unit).is_err() {
            tracing::warn!("work queue disconnected, dropping dispatched unit");
        }
    }
}

/// Receiving half: runs posted units on whichever thread drains it.
pub struct WorkQueue {
    rx: Receiver<WorkUnit>,
}

impl WorkQueue {
    /// Run every unit already posted. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(unit) = self.rx.try_recv() {
            unit();
            ran += 1;
        }
        ran
    }

    /// Wait up to `timeout` for one unit and run it.
    pub fn run_one_timeout(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(unit) => {
                unit();
                true
            }
            Err(_) => false,
        }
    }

    /// Run units until every dispatcher has been dropped.
    pub fn run_blocking(&self) -> usize {
        let mut ran = 0;
        while let Ok(unit) = self.rx.recv() {
            unit();
            ran += 1;
        }
        tracing::debug!(ran, "work queue drained");
        ran
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

/// Runs each unit immediately on the posting thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl InlineDispatcher {
    pub fn shared() -> SharedDispatcher {
        Arc::new(InlineDispatcher)
    }
}

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, unit: WorkUnit) {
        unit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::thread;

    #[test]
    fn test_channel_runs_in_post_order() {
        let (dispatcher, queue) = channel();
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..5 {
            let log = log.clone();
            dispatcher.dispatch(Box::new(move || log.lock().push(i)));
        }
        assert!(log.lock().is_empty());
        assert_eq!(queue.pending(), 5);
        assert_eq!(queue.run_pending(), 5);
        assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4]);
        assert_eq!(queue.run_pending(), 0);
    }

    #[test]
    fn test_run_blocking_on_worker_thread() {
        let (dispatcher, queue) = channel();
        let log = Arc::new(Mutex::new(Vec::new()));
        let worker = thread::spawn(move || queue.run_blocking());
        for i in 0..20 {
            let log = log.clone();
            dispatcher.dispatch(Box::new(move || log.lock().push(i)));
        }
        drop(dispatcher);
        assert_eq!(worker.join().unwrap(), 20);
        assert_eq!(*log.lock(), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_posting_never_waits_for_the_queue() {
        let (dispatcher, queue) = channel();
        for _ in 0..10_000 {
            dispatcher.dispatch(Box::new(|| {}));
        }
        assert_eq!(queue.pending(), 10_000);
        assert_eq!(queue.run_pending(), 10_000);
    }

    #[test]
    fn test_disconnected_queue_drops_unit() {
        let (dispatcher, queue) = channel();
        drop(queue);
        let ran = Arc::new(Mutex::new(false));
        let flag = ran.clone();
        dispatcher.dispatch(Box::new(move || *flag.lock() = true));
        assert!(!*ran.lock());
    }

    #[test]
    fn test_inline_runs_immediately() {
        let ran = Arc::new(Mutex::new(0));
        let counter = ran.clone();
        InlineDispatcher.dispatch(Box::new(move || *counter.lock() += 1));
        assert_eq!(*ran.lock(), 1);
    }
}
