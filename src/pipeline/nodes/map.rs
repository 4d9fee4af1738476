//! MapList: element-wise projection with a cached result per element.

use crate::error::Result;
use crate::list::event::ListEvent;
use crate::list::item::Element;
use crate::list::mutable::ObservableList;
use crate::list::observer::{ListObserver, ObserverRegistry};
use crate::list::source_set::SharedList;
use crate::list::store::OrderedStore;
use crate::list::trigger::Linked;
use crate::pipeline::link::UpstreamLink;
use crate::sync::SharedMonitor;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Mapping function applied to every upstream element.
pub type Mapper<S, T> = Arc<dyn Fn(&S) -> T + Send + Sync>;

/// Index-preserving projection: element `i` is always `mapper(upstream[i])`,
/// and every upstream event is re-emitted with the same indices.
pub struct MapList<S: Element, T: Element> {
    monitor: SharedMonitor,
    link: UpstreamLink<S>,
    mapper: Mapper<S, T>,
    store: Mutex<OrderedStore<T>>,
    observers: ObserverRegistry,
}

impl<S: Element, T: Element> MapList<S, T> {
    pub fn new(upstream: SharedList<S>, mapper: Mapper<S, T>) -> Result<Arc<Self>> {
        let monitor = upstream.monitor().clone();
        let _guard = monitor.acquire_write();
        let store: OrderedStore<T> = upstream.to_vec().iter().map(|v| mapper(v)).collect();

        let list = Arc::new_cyclic(|weak: &Weak<Self>| Self {
            monitor: monitor.clone(),
            link: UpstreamLink::new(upstream, weak.clone(), Self::on_upstream),
            mapper,
            store: Mutex::new(store),
            observers: ObserverRegistry::new(),
        });
        list.link.attach()?;
        tracing::debug!(len = list.len(), "map linked");
        Ok(list)
    }

    fn map_range(&self, start: usize, count: usize) -> Result<Vec<T>> {
        let values = self.link.read(start, count)?;
        Ok(values.iter().map(|v| (self.mapper)(v)).collect())
    }

    fn notify(&self, event: ListEvent) -> Result<()> {
        self.observers.notify(event)
    }

    fn on_upstream(&self, event: ListEvent) -> Result<()> {
        match event {
            ListEvent::Added { start, count } => {
                let mapped = self.map_range(start, count)?;
                self.store.lock().insert_all(start, mapped)?;
                self.notify(event)
            }
            ListEvent::Changing { .. } | ListEvent::Resetting => self.notify(event),
            ListEvent::Changed { start, count } => {
                let mapped = self.map_range(start, count)?;
                self.store.lock().set_all(start, mapped)?;
                self.notify(event)
            }
            ListEvent::Removing { start, count } => {
                self.notify(event)?;
                self.store.lock().remove_range(start, count)?;
                self.notify(ListEvent::Removed { start, count })
            }
            ListEvent::Removed { .. } => Ok(()),
            ListEvent::Moved { from, to, count } => {
                self.store.lock().move_range(from, to, count)?;
                self.notify(event)
            }
            ListEvent::Reset => {
                let values = self.link.upstream().to_vec();
                let mapped: OrderedStore<T> = values.iter().map(|v| (self.mapper)(v)).collect();
                *self.store.lock() = mapped;
                self.notify(event)
            }
        }
    }
}

impl<S: Element, T: Element> ObservableList<T> for MapList<S, T> {
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

impl<S: Element, T: Element> Linked for MapList<S, T> {
    fn unlink(&self) {
        let _guard = self.monitor.acquire_write();
        if self.link.detach() {
            tracing::debug!("map unlinked");
        }
    }
}

impl<S: Element, T: Element> Drop for MapList<S, T> {
    fn drop(&mut self) {
        self.unlink();
    }
}
