//! Predicates, comparators and the observable slots that hold them.

use crate::error::Result;
use crate::list::id::SubscriptionId;
use crate::sync::{Listener, ListenerSet, SharedMonitor};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Predicate deciding whether an element is visible through a Filter.
pub trait ItemFilter<T>: Send + Sync {
    fn accept(&self, item: &T) -> bool;
}

impl<T, F> ItemFilter<T> for F
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn accept(&self, item: &T) -> bool {
        self(item)
    }
}

/// Strict "less than" used by the Order operator.
///
/// Two elements are equal in order when neither is less than the other.
pub trait ItemsOrder<T>: Send + Sync {
    fn is_less(&self, a: &T, b: &T) -> bool;
}

impl<T, F> ItemsOrder<T> for F
where
    F: Fn(&T, &T) -> bool + Send + Sync,
{
    fn is_less(&self, a: &T, b: &T) -> bool {
        self(a, b)
    }
}

pub type SharedFilter<T> = Arc<dyn ItemFilter<T>>;
pub type SharedOrder<T> = Arc<dyn ItemsOrder<T>>;

/// Payload delivered to reference listeners.
#[derive(Clone)]
pub struct ReferenceChange<V> {
    pub previous: V,
    pub current: V,
}

/// A single value slot with change notification.
pub trait ObservableReference<V>: Send + Sync {
    fn get(&self) -> V;
    fn subscribe(&self, listener: Listener<ReferenceChange<V>>) -> SubscriptionId;
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Monitor guarding `set` and listener delivery, if the value can change.
    fn monitor(&self) -> Option<&SharedMonitor> {
        None
    }
}

pub type FilterReference<T> = Arc<dyn ObservableReference<SharedFilter<T>>>;
pub type OrderReference<T> = Arc<dyn ObservableReference<SharedOrder<T>>>;

/// Reference whose value can be swapped while operators are linked to it.
pub struct MutableReference<V> {
    monitor: SharedMonitor,
    value: Mutex<V>,
    listeners: ListenerSet<ReferenceChange<V>>,
}

impl<V: Clone + Send + Sync + 'static> MutableReference<V> {
    pub fn new(value: V, monitor: SharedMonitor) -> Arc<Self> {
        Arc::new(Self {
            monitor,
            value: Mutex::new(value),
            listeners: ListenerSet::new(),
        })
    }

    /// Replace the value and notify listeners under the write guard.
    pub fn set(&self, value: V) -> Result<()> {
        let _guard = self.monitor.acquire_write();
        let previous = std::mem::replace(&mut *self.value.lock(), value.clone());
        self.listeners.emit(&ReferenceChange {
            previous,
            current: value,
        })
    }
}

impl<V: Clone + Send + Sync + 'static> ObservableReference<V> for MutableReference<V> {
    fn get(&self) -> V {
        self.value.lock().clone()
    }

    fn subscribe(&self, listener: Listener<ReferenceChange<V>>) -> SubscriptionId {
        let _guard = self.monitor.acquire_write();
        self.listeners.subscribe(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let _guard = self.monitor.acquire_write();
        self.listeners.unsubscribe(id)
    }

    fn monitor(&self) -> Option<&SharedMonitor> {
        Some(&self.monitor)
    }
}

impl<V> fmt::Debug for MutableReference<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutableReference")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Reference that never changes. Subscriptions are accepted and never called.
pub struct ImmutableReference<V> {
    value: V,
}

impl<V: Clone + Send + Sync + 'static> ImmutableReference<V> {
    pub fn new(value: V) -> Arc<Self> {
        Arc::new(Self { value })
    }
}

impl<V: Clone + Send + Sync + 'static> ObservableReference<V> for ImmutableReference<V> {
    fn get(&self) -> V {
        self.value.clone()
    }

    fn subscribe(&self, _listener: Listener<ReferenceChange<V>>) -> SubscriptionId {
        SubscriptionId::INVALID
    }

    fn unsubscribe(&self, _id: SubscriptionId) -> bool {
        false
    }
}

/// Fixed filter reference built from a closure.
pub fn fixed_filter<T, F>(filter: F) -> FilterReference<T>
where
    T: 'static,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    let filter: SharedFilter<T> = Arc::new(filter);
    ImmutableReference::new(filter)
}

/// Fixed order reference built from a "less than" closure.
pub fn fixed_order<T, F>(order: F) -> OrderReference<T>
where
    T: 'static,
    F: Fn(&T, &T) -> bool + Send + Sync + 'static,
{
    let order: SharedOrder<T> = Arc::new(order);
    ImmutableReference::new(order)
}
