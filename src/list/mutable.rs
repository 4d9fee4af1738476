//! The read surface shared by all lists, and the canonical mutable list.

use crate::error::{checked_end, CollectionError, Result};
use crate::list::event::ListEvent;
use crate::list::item::Element;
use crate::list::observer::{ListObserver, ObserverRegistry};
use crate::list::store::OrderedStore;
use crate::list::trigger::Linked;
use crate::sync::SharedMonitor;
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

/// Read and observe surface implemented by every list in a pipeline.
pub trait ObservableList<T>: Send + Sync {
    fn get(&self, index: usize) -> Result<T>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn add_observer(&self, observer: Arc<dyn ListObserver>) -> Result<()>;

    /// Returns false if the observer was not registered.
    fn remove_observer(&self, observer: &Arc<dyn ListObserver>) -> bool;

    /// Monitor guarding this list's contents.
    fn monitor(&self) -> &SharedMonitor;

    /// Copy the current contents under a single read guard.
    fn to_vec(&self) -> Vec<T> {
        let _guard = self.monitor().acquire_read();
        (0..self.len()).filter_map(|i| self.get(i).ok()).collect()
    }
}

/// Mutation surface of a [`MutableList`].
pub trait ListMutator<T>: Send + Sync {
    fn add(&self, value: T) -> Result<()>;
    fn add_at(&self, index: usize, value: T) -> Result<()>;
    fn add_all(&self, index: usize, values: Vec<T>) -> Result<()>;
    fn set(&self, index: usize, value: T) -> Result<()>;
    fn set_all(&self, index: usize, values: Vec<T>) -> Result<()>;
    /// Remove up to `count` elements starting at `index`.
    ///
    /// `count` is clamped to the tail length; only `index` itself is checked.
    fn remove(&self, index: usize, count: usize) -> Result<()>;
    fn clear(&self) -> Result<()>;
    fn move_range(&self, from: usize, to: usize, count: usize) -> Result<()>;
    fn reset(&self, values: Vec<T>) -> Result<()>;
}

/// Owned, mutable, observable sequence at the root of a pipeline.
///
/// Every mutation holds the monitor's write guard for its full propagation and
/// emits the before/after pair for what it changed. Operations that change
/// nothing emit nothing.
pub struct MutableList<T> {
    monitor: SharedMonitor,
    store: Mutex<OrderedStore<T>>,
    observers: ObserverRegistry,
    fan_out: Mutex<Option<FanOutLink<T>>>,
}

struct FanOutLink<T> {
    fan_out: Weak<MutatorFanOut<T>>,
    adapter: Arc<dyn ListMutator<T>>,
}

impl<T: Element> MutableList<T> {
    pub fn new(monitor: SharedMonitor) -> Arc<Self> {
        Arc::new(Self::with_store(monitor, OrderedStore::new()))
    }

    pub fn from_vec(values: Vec<T>, monitor: SharedMonitor) -> Arc<Self> {
        Arc::new(Self::with_store(monitor, OrderedStore::from(values)))
    }

    /// Create a list driven by `fan_out`. The list stops receiving fan-out
    /// calls once unlinked or dropped.
    pub fn with_fan_out(fan_out: &Arc<MutatorFanOut<T>>) -> Result<Arc<Self>> {
        let list = Arc::new(Self::with_store(fan_out.monitor.clone(), OrderedStore::new()));
        let adapter: Arc<dyn ListMutator<T>> = Arc::new(WeakMutator {
            target: Arc::downgrade(&list),
        });
        fan_out.register(adapter.clone())?;
        *list.fan_out.lock() = Some(FanOutLink {
            fan_out: Arc::downgrade(fan_out),
            adapter,
        });
        Ok(list)
    }

    fn with_store(monitor: SharedMonitor, store: OrderedStore<T>) -> Self {
        Self {
            monitor,
            store: Mutex::new(store),
            observers: ObserverRegistry::new(),
            fan_out: Mutex::new(None),
        }
    }

    fn notify(&self, event: ListEvent) -> Result<()> {
        self.observers.notify(event)
    }
}

impl<T: Element> ObservableList<T> for MutableList<T> {
    fn get(&self, index: usize) -> Result<T> {
        let _guard = self.monitor.acquire_read();
        self.store.lock().get_checked(index).cloned()
    }

    fn len(&self) -> usize {
        let _guard = self.monitor.acquire_read();
        self.store.lock().len()
    }

    fn add_observer(&self, observer: Arc<dyn ListObserver>) -> Result<()> {
        let _guard = self.monitor.acquire_write();
        self.observers.add(observer)
    }

    fn remove_observer(&self, observer: &Arc<dyn ListObserver>) -> bool {
        let _guard = self.monitor.acquire_write();
        self.observers.remove(observer)
    }

    fn monitor(&self) -> &SharedMonitor {
        &self.monitor
    }
}

impl<T: Element> ListMutator<T> for MutableList<T> {
    fn add(&self, value: T) -> Result<()> {
        let _guard = self.monitor.acquire_write();
        let index = {
            let mut store = self.store.lock();
            store.push(value);
            store.len() - 1
        };
        self.notify(ListEvent::Added {
            start: index,
            count: 1,
        })
    }

    fn add_at(&self, index: usize, value: T) -> Result<()> {
        let _guard = self.monitor.acquire_write();
        self.store.lock().insert(index, value)?;
        self.notify(ListEvent::Added {
            start: index,
            count: 1,
        })
    }

    fn add_all(&self, index: usize, values: Vec<T>) -> Result<()> {
        let _guard = self.monitor.acquire_write();
        let count = values.len();
        {
            let mut store = self.store.lock();
            if index > store.len() {
                return Err(CollectionError::out_of_range(index, store.len()));
            }
            if count == 0 {
                return Ok(());
            }
            store.insert_all(index, values)?;
        }
        self.notify(ListEvent::Added {
            start: index,
            count,
        })
    }

    fn set(&self, index: usize, value: T) -> Result<()> {
        let _guard = self.monitor.acquire_write();
        let len = self.store.lock().len();
        if index >= len {
            return Err(CollectionError::out_of_range(index, len));
        }
        self.notify(ListEvent::Changing {
            start: index,
            count: 1,
        })?;
        self.store.lock().set(index, value)?;
        self.notify(ListEvent::Changed {
            start: index,
            count: 1,
        })
    }

    fn set_all(&self, index: usize, values: Vec<T>) -> Result<()> {
        let _guard = self.monitor.acquire_write();
        let count = values.len();
        let len = self.store.lock().len();
        let end = checked_end(index, count)?;
        if end > len {
            return Err(CollectionError::out_of_range(end, len));
        }
        if count == 0 {
            return Ok(());
        }
        self.notify(ListEvent::Changing {
            start: index,
            count,
        })?;
        self.store.lock().set_all(index, values)?;
        self.notify(ListEvent::Changed {
            start: index,
            count,
        })
    }

    fn remove(&self, index: usize, count: usize) -> Result<()> {
        let _guard = self.monitor.acquire_write();
        let len = self.store.lock().len();
        if index >= len {
            return Err(CollectionError::out_of_range(index, len));
        }
        let count = count.min(len - index);
        if count == 0 {
            return Ok(());
        }
        self.notify(ListEvent::Removing {
            start: index,
            count,
        })?;
        self.store.lock().remove_range(index, count)?;
        self.notify(ListEvent::Removed {
            start: index,
            count,
        })
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.monitor.acquire_write();
        let count = self.store.lock().len();
        if count == 0 {
            return Ok(());
        }
        self.notify(ListEvent::Removing { start: 0, count })?;
        self.store.lock().clear();
        self.notify(ListEvent::Removed { start: 0, count })
    }

    fn move_range(&self, from: usize, to: usize, count: usize) -> Result<()> {
        let _guard = self.monitor.acquire_write();
        self.store.lock().move_range(from, to, count)?;
        if from == to || count == 0 {
            return Ok(());
        }
        self.notify(ListEvent::Moved { from, to, count })
    }

    fn reset(&self, values: Vec<T>) -> Result<()> {
        let _guard = self.monitor.acquire_write();
        self.notify(ListEvent::Resetting)?;
        *self.store.lock() = OrderedStore::from(values);
        self.notify(ListEvent::Reset)
    }
}

impl<T: Element> Linked for MutableList<T> {
    /// Detach from the fan-out this list was created with, if any.
    fn unlink(&self) {
        let _guard = self.monitor.acquire_write();
        if let Some(link) = self.fan_out.lock().take() {
            if let Some(fan_out) = link.fan_out.upgrade() {
                fan_out.unregister(&link.adapter);
            }
            tracing::debug!("mutable list detached from fan-out");
        }
    }
}

impl<T> Drop for MutableList<T> {
    fn drop(&mut self) {
        if let Some(link) = self.fan_out.get_mut().take() {
            if let Some(fan_out) = link.fan_out.upgrade() {
                fan_out.unregister(&link.adapter);
            }
        }
    }
}

impl<T> fmt::Debug for MutableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutableList")
            .field("len", &self.store.lock().len())
            .field("observers", &self.observers)
            .finish()
    }
}

/// Fan-out entry pointing at a list without keeping it alive.
struct WeakMutator<T> {
    target: Weak<MutableList<T>>,
}

impl<T: Element> WeakMutator<T> {
    fn with(&self, op: impl FnOnce(&MutableList<T>) -> Result<()>) -> Result<()> {
        match self.target.upgrade() {
            Some(list) => op(&list),
            None => Ok(()),
        }
    }
}

impl<T: Element> ListMutator<T> for WeakMutator<T> {
    fn add(&self, value: T) -> Result<()> {
        self.with(|l| l.add(value))
    }

    fn add_at(&self, index: usize, value: T) -> Result<()> {
        self.with(|l| l.add_at(index, value))
    }

    fn add_all(&self, index: usize, values: Vec<T>) -> Result<()> {
        self.with(|l| l.add_all(index, values))
    }

    fn set(&self, index: usize, value: T) -> Result<()> {
        self.with(|l| l.set(index, value))
    }

    fn set_all(&self, index: usize, values: Vec<T>) -> Result<()> {
        self.with(|l| l.set_all(index, values))
    }

    fn remove(&self, index: usize, count: usize) -> Result<()> {
        self.with(|l| l.remove(index, count))
    }

    fn clear(&self) -> Result<()> {
        self.with(|l| l.clear())
    }

    fn move_range(&self, from: usize, to: usize, count: usize) -> Result<()> {
        self.with(|l| l.move_range(from, to, count))
    }

    fn reset(&self, values: Vec<T>) -> Result<()> {
        self.with(|l| l.reset(values))
    }
}

/// Broadcasts each mutation call to every registered mutator.
///
/// The write guard is taken once for the whole broadcast, so lists driven by
/// one fan-out change in lockstep as far as readers can tell.
pub struct MutatorFanOut<T> {
    monitor: SharedMonitor,
    mutators: Mutex<Vec<Arc<dyn ListMutator<T>>>>,
}

impl<T> MutatorFanOut<T> {
    pub fn new(monitor: SharedMonitor) -> Arc<Self> {
        Arc::new(Self {
            monitor,
            mutators: Mutex::new(Vec::new()),
        })
    }

    pub fn monitor(&self) -> &SharedMonitor {
        &self.monitor
    }

    pub fn register(&self, mutator: Arc<dyn ListMutator<T>>) -> Result<()> {
        let _guard = self.monitor.acquire_write();
        let mut mutators = self.mutators.lock();
        if mutators.iter().any(|m| same_mutator(m, &mutator)) {
            return Err(CollectionError::DuplicateRegistration("list mutator"));
        }
        mutators.push(mutator);
        Ok(())
    }

    pub fn unregister(&self, mutator: &Arc<dyn ListMutator<T>>) -> bool {
        let _guard = self.monitor.acquire_write();
        let mut mutators = self.mutators.lock();
        let before = mutators.len();
        mutators.retain(|m| !same_mutator(m, mutator));
        mutators.len() != before
    }

    pub fn len(&self) -> usize {
        self.mutators.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutators.lock().is_empty()
    }

    fn broadcast(&self, op: impl Fn(&dyn ListMutator<T>) -> Result<()>) -> Result<()> {
        let _guard = self.monitor.acquire_write();
        let snapshot = self.mutators.lock().clone();
        for mutator in snapshot {
            op(mutator.as_ref())?;
        }
        Ok(())
    }
}

fn same_mutator<T>(a: &Arc<dyn ListMutator<T>>, b: &Arc<dyn ListMutator<T>>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl<T: Element> ListMutator<T> for MutatorFanOut<T> {
    fn add(&self, value: T) -> Result<()> {
        self.broadcast(|m| m.add(value.clone()))
    }

    fn add_at(&self, index: usize, value: T) -> Result<()> {
        self.broadcast(|m| m.add_at(index, value.clone()))
    }

    fn add_all(&self, index: usize, values: Vec<T>) -> Result<()> {
        self.broadcast(|m| m.add_all(index, values.clone()))
    }

    fn set(&self, index: usize, value: T) -> Result<()> {
        self.broadcast(|m| m.set(index, value.clone()))
    }

    fn set_all(&self, index: usize, values: Vec<T>) -> Result<()> {
        self.broadcast(|m| m.set_all(index, values.clone()))
    }

    fn remove(&self, index: usize, count: usize) -> Result<()> {
        self.broadcast(|m| m.remove(index, count))
    }

    fn clear(&self) -> Result<()> {
        self.broadcast(|m| m.clear())
    }

    fn move_range(&self, from: usize, to: usize, count: usize) -> Result<()> {
        self.broadcast(|m| m.move_range(from, to, count))
    }

    fn reset(&self, values: Vec<T>) -> Result<()> {
        self.broadcast(|m| m.reset(values.clone()))
    }
}

impl<T> fmt::Debug for MutatorFanOut<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutatorFanOut")
            .field("mutators", &self.mutators.lock().len())
            .finish()
    }
}
