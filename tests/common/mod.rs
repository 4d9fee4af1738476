//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use listflow::list::{ListEvent, MutableObject, MutationSignal, ObservableList};
use listflow::observer_fn;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Collects every event a list emits.
pub struct EventRecorder {
    events: Arc<Mutex<Vec<ListEvent>>>,
}

impl EventRecorder {
    pub fn attach<T>(list: &Arc<dyn ObservableList<T>>) -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        list.add_observer(observer_fn(move |event| {
            sink.lock().push(event);
            Ok(())
        }))
        .expect("fresh observer");
        Self { events }
    }

    pub fn events(&self) -> Vec<ListEvent> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<ListEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

/// A consumer that rebuilds a list purely from its events, reading values only
/// when an "after" event says they are in place. If an operator emits wrong
/// indices the replica diverges from the list.
pub struct Replica<T> {
    values: Arc<Mutex<Vec<T>>>,
}

impl<T: Clone + Send + Sync + 'static> Replica<T> {
    pub fn attach(list: &Arc<dyn ObservableList<T>>) -> Self {
        let values = Arc::new(Mutex::new(list.to_vec()));
        let sink = values.clone();
        let source = Arc::downgrade(list);
        list.add_observer(observer_fn(move |event| {
            let Some(list) = source.upgrade() else {
                return Ok(());
            };
            let mut values = sink.lock();
            match event {
                ListEvent::Added { start, count } => {
                    let added: Vec<T> = (start..start + count)
                        .map(|i| list.get(i))
                        .collect::<listflow::Result<_>>()?;
                    values.splice(start..start, added);
                }
                ListEvent::Changed { start, count } => {
                    for i in start..start + count {
                        values[i] = list.get(i)?;
                    }
                }
                ListEvent::Removed { start, count } => {
                    values.drain(start..start + count);
                }
                ListEvent::Moved { from, to, count } => {
                    let moved: Vec<T> = values.drain(from..from + count).collect();
                    values.splice(to..to, moved);
                }
                ListEvent::Reset => *values = list.to_vec(),
                ListEvent::Changing { .. } | ListEvent::Removing { .. } | ListEvent::Resetting => {}
            }
            Ok(())
        }))
        .expect("fresh observer");
        Self { values }
    }

    pub fn values(&self) -> Vec<T> {
        self.values.lock().clone()
    }
}

/// An integer cell that reports in-place changes through its signal.
#[derive(Debug)]
pub struct Counter {
    value: AtomicI64,
    signal: MutationSignal,
}

impl Counter {
    pub fn new(value: i64) -> Arc<Self> {
        Arc::new(Self {
            value: AtomicI64::new(value),
            signal: MutationSignal::new(),
        })
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }

    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::SeqCst);
        self.signal.notify_mutated().expect("mutation callbacks succeed");
    }
}

impl MutableObject for Counter {
    fn mutation_signal(&self) -> Option<&MutationSignal> {
        Some(&self.signal)
    }
}

pub fn values(list: &Arc<dyn ObservableList<Arc<Counter>>>) -> Vec<i64> {
    list.to_vec().iter().map(|c| c.get()).collect()
}
