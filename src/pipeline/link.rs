//! Subscription edge from an operator to its upstream list.
//!
//! The operator holds the upstream strongly; the upstream's registry only sees
//! an observer that reaches the operator through a `Weak`, so dropping the last
//! handle to an operator is enough to stop it receiving events.

use crate::error::{checked_end, CollectionError, Result};
use crate::list::event::ListEvent;
use crate::list::observer::{observer_fn, ListObserver};
use crate::list::source_set::SharedList;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

pub(crate) struct UpstreamLink<T> {
    upstream: SharedList<T>,
    observer: Arc<dyn ListObserver>,
    linked: AtomicBool,
}

impl<T: 'static> UpstreamLink<T> {
    /// Build the edge without registering it. `handler` runs for every upstream
    /// event while `target` is alive.
    pub(crate) fn new<O, F>(upstream: SharedList<T>, target: Weak<O>, handler: F) -> Self
    where
        O: Send + Sync + 'static,
        F: Fn(&O, ListEvent) -> Result<()> + Send + Sync + 'static,
    {
        let observer = observer_fn(move |event| match target.upgrade() {
            Some(operator) => handler(&operator, event),
            None => Ok(()),
        });
        Self {
            upstream,
            observer,
            linked: AtomicBool::new(false),
        }
    }

    pub(crate) fn attach(&self) -> Result<()> {
        self.upstream.add_observer(self.observer.clone())?;
        self.linked.store(true, Ordering::Release);
        Ok(())
    }

    /// Remove the observer from the upstream. Returns true on the first call
    /// after a successful `attach`.
    pub(crate) fn detach(&self) -> bool {
        if self.linked.swap(false, Ordering::AcqRel) {
            self.upstream.remove_observer(&self.observer);
            true
        } else {
            false
        }
    }

    #[cfg(test)]
    pub(crate) fn is_linked(&self) -> bool {
        self.linked.load(Ordering::Acquire)
    }

    pub(crate) fn upstream(&self) -> &SharedList<T> {
        &self.upstream
    }

    pub(crate) fn read(&self, start: usize, count: usize) -> Result<Vec<T>> {
        read_range(&self.upstream, start, count)
    }
}

/// Copy `count` elements of `list` starting at `start`.
pub(crate) fn read_range<T>(list: &SharedList<T>, start: usize, count: usize) -> Result<Vec<T>> {
    let end = checked_end(start, count)?;
    let len = list.len();
    if end > len {
        return Err(CollectionError::out_of_range(end, len));
    }
    (start..end).map(|i| list.get(i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::mutable::{ListMutator, MutableList};
    use crate::sync::NoopMonitor;
    use parking_lot::Mutex;

    struct Sink {
        events: Mutex<Vec<ListEvent>>,
    }

    #[test]
    fn test_link_forwards_until_detached() {
        let source = MutableList::from_vec(vec![1, 2], NoopMonitor::shared());
        let sink = Arc::new(Sink {
            events: Mutex::new(Vec::new()),
        });
        let link = UpstreamLink::new(
            source.clone() as SharedList<i32>,
            Arc::downgrade(&sink),
            |sink: &Sink, event| {
                sink.events.lock().push(event);
                Ok(())
            },
        );
        link.attach().unwrap();
        assert_eq!(link.read(0, 2).unwrap(), vec![1, 2]);
        assert!(link.read(1, 2).is_err());

        source.add(3).unwrap();
        assert!(link.detach());
        assert!(!link.detach());
        source.add(4).unwrap();
        assert_eq!(
            *sink.events.lock(),
            vec![ListEvent::Added { start: 2, count: 1 }]
        );
    }

    #[test]
    fn test_dropped_target_is_ignored() {
        let source = MutableList::from_vec(vec![1], NoopMonitor::shared());
        let sink = Arc::new(Sink {
            events: Mutex::new(Vec::new()),
        });
        let link = UpstreamLink::new(
            source.clone() as SharedList<i32>,
            Arc::downgrade(&sink),
            |_: &Sink, _| Err(CollectionError::InvalidArgument("unreachable".into())),
        );
        link.attach().unwrap();
        drop(sink);
        source.add(2).unwrap();
        assert!(link.is_linked());
    }
}
