//! Helpers shared by the operator unit tests.

use crate::list::event::ListEvent;
use crate::list::item::{MutableObject, MutationSignal};
use crate::list::mutable::ObservableList;
use crate::list::observer::observer_fn;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

pub(crate) type EventLog = Arc<Mutex<Vec<ListEvent>>>;

/// Register an observer that appends every event of `list` to the returned log.
pub(crate) fn record<T, L>(list: &Arc<L>) -> EventLog
where
    L: ObservableList<T> + ?Sized,
{
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    list.add_observer(observer_fn(move |event| {
        sink.lock().push(event);
        Ok(())
    }))
    .unwrap();
    events
}

/// An integer cell that reports in-place changes.
pub(crate) struct Level {
    value: AtomicI32,
    pub(crate) signal: MutationSignal,
}

impl Level {
    pub(crate) fn new(value: i32) -> Arc<Self> {
        Arc::new(Self {
            value: AtomicI32::new(value),
            signal: MutationSignal::new(),
        })
    }

    pub(crate) fn get(&self) -> i32 {
        self.value.load(Ordering::SeqCst)
    }

    pub(crate) fn set(&self, value: i32) {
        self.value.store(value, Ordering::SeqCst);
        self.signal.notify_mutated().unwrap();
    }
}

impl MutableObject for Level {
    fn mutation_signal(&self) -> Option<&MutationSignal> {
        Some(&self.signal)
    }
}

pub(crate) fn levels(list: &[Arc<Level>]) -> Vec<i32> {
    list.iter().map(|l| l.get()).collect()
}
