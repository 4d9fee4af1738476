//! Dynamic set of member lists concatenated by a Merge operator.

use crate::error::{CollectionError, Result};
use crate::list::id::SubscriptionId;
use crate::list::mutable::ObservableList;
use crate::sync::{ensure_same_monitor, Listener, ListenerSet, SharedMonitor};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

pub type SharedList<T> = Arc<dyn ObservableList<T>>;

/// Membership change delivered to source set listeners.
pub enum SourceSetEvent<T> {
    Added(SharedList<T>),
    Removed(SharedList<T>),
}

impl<T> fmt::Debug for SourceSetEvent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSetEvent::Added(_) => f.write_str("Added"),
            SourceSetEvent::Removed(_) => f.write_str("Removed"),
        }
    }
}

/// Duplicate-rejecting collection of lists, identified by `Arc` address.
pub struct SourceSet<T> {
    monitor: SharedMonitor,
    sources: Mutex<Vec<SharedList<T>>>,
    listeners: ListenerSet<SourceSetEvent<T>>,
}

impl<T: 'static> SourceSet<T> {
    pub fn new(monitor: SharedMonitor) -> Arc<Self> {
        Arc::new(Self {
            monitor,
            sources: Mutex::new(Vec::new()),
            listeners: ListenerSet::new(),
        })
    }

    pub fn monitor(&self) -> &SharedMonitor {
        &self.monitor
    }

    /// Add a member. It must share this set's monitor.
    pub fn add(&self, source: SharedList<T>) -> Result<()> {
        ensure_same_monitor(&self.monitor, source.monitor(), "source list")?;
        let _guard = self.monitor.acquire_write();
        {
            let mut sources = self.sources.lock();
            if sources.iter().any(|s| same_list(s, &source)) {
                return Err(CollectionError::DuplicateRegistration("source list"));
            }
            sources.push(source.clone());
        }
        self.listeners.emit(&SourceSetEvent::Added(source))
    }

    /// Remove a member. Returns `Ok(false)` if it was not in the set.
    pub fn remove(&self, source: &SharedList<T>) -> Result<bool> {
        let _guard = self.monitor.acquire_write();
        let removed = {
            let mut sources = self.sources.lock();
            match sources.iter().position(|s| same_list(s, source)) {
                Some(pos) => sources.remove(pos),
                None => return Ok(false),
            }
        };
        self.listeners.emit(&SourceSetEvent::Removed(removed))?;
        Ok(true)
    }

    pub fn contains(&self, source: &SharedList<T>) -> bool {
        self.sources.lock().iter().any(|s| same_list(s, source))
    }

    /// Current members in insertion order.
    pub fn sources(&self) -> Vec<SharedList<T>> {
        self.sources.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.sources.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.lock().is_empty()
    }

    pub fn subscribe(&self, listener: Listener<SourceSetEvent<T>>) -> SubscriptionId {
        let _guard = self.monitor.acquire_write();
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let _guard = self.monitor.acquire_write();
        self.listeners.unsubscribe(id)
    }
}

pub(crate) fn same_list<T>(a: &SharedList<T>, b: &SharedList<T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl<T> fmt::Debug for SourceSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceSet")
            .field("sources", &self.sources.lock().len())
            .field("listeners", &self.listeners)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::mutable::MutableList;
    use crate::sync::NoopMonitor;

    #[test]
    fn test_add_remove_notifies() {
        let monitor = NoopMonitor::shared();
        let set = SourceSet::<i32>::new(monitor.clone());
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        set.subscribe(Arc::new(move |event: &SourceSetEvent<i32>| {
            sink.lock().push(format!("{event:?}"));
            Ok(())
        }));

        let list: SharedList<i32> = MutableList::from_vec(vec![1], monitor);
        set.add(list.clone()).unwrap();
        assert!(set.contains(&list));
        assert_eq!(
            set.add(list.clone()),
            Err(CollectionError::DuplicateRegistration("source list"))
        );
        assert!(set.remove(&list).unwrap());
        assert!(!set.remove(&list).unwrap());
        assert_eq!(*log.lock(), vec!["Added", "Removed"]);
    }

    #[test]
    fn test_foreign_monitor_rejected_before_listeners_run() {
        let set = SourceSet::<i32>::new(NoopMonitor::shared());
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        set.subscribe(Arc::new(move |_: &SourceSetEvent<i32>| {
            *counter.lock() += 1;
            Ok(())
        }));

        let foreign: SharedList<i32> = MutableList::from_vec(vec![1], NoopMonitor::shared());
        assert!(matches!(
            set.add(foreign.clone()),
            Err(CollectionError::InvalidArgument(_))
        ));
        assert!(set.is_empty());
        assert!(!set.contains(&foreign));
        assert_eq!(*calls.lock(), 0);
    }
}
