//! OrderList: sorted projection of an upstream list.
//!
//! Elements are kept sorted by an asymmetric "less than". New elements go to
//! the first position whose element is not less than them, so equal elements
//! keep arrival order. Upstream moves never change the sorted order and are
//! only tracked in the identity mirror.

use crate::error::{CollectionError, Result};
use crate::list::event::ListEvent;
use crate::list::id::{ItemId, SubscriptionId};
use crate::list::item::{Element, MutableObject};
use crate::list::mutable::ObservableList;
use crate::list::observer::{ListObserver, ObserverRegistry};
use crate::list::reference::{ItemsOrder, OrderReference, ReferenceChange, SharedOrder};
use crate::list::source_set::SharedList;
use crate::list::store::OrderedStore;
use crate::list::trigger::Linked;
use crate::pipeline::container::ItemContainer;
use crate::pipeline::link::UpstreamLink;
use crate::sync::{ensure_same_monitor, SharedMonitor};
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::sync::{Arc, Weak};

pub struct OrderList<T: Element + MutableObject> {
    monitor: SharedMonitor,
    link: UpstreamLink<T>,
    reference: OrderReference<T>,
    reference_subscription: Mutex<Option<SubscriptionId>>,
    state: Mutex<OrderState<T>>,
    observers: ObserverRegistry,
    weak_self: Weak<Self>,
}

struct OrderState<T: MutableObject> {
    order: SharedOrder<T>,
    mirror: OrderedStore<ItemId>,
    sorted: OrderedStore<ItemContainer<T>>,
}

fn compare<T>(order: &dyn ItemsOrder<T>, a: &T, b: &T) -> Ordering {
    if order.is_less(a, b) {
        Ordering::Less
    } else if order.is_less(b, a) {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

impl<T: MutableObject> OrderState<T> {
    fn new(order: SharedOrder<T>) -> Self {
        Self {
            order,
            mirror: OrderedStore::new(),
            sorted: OrderedStore::new(),
        }
    }

    /// First index whose element is not less than `value`.
    fn insertion_point(&self, value: &T) -> usize {
        self.sorted
            .partition_point(|c| self.order.is_less(&c.value, value))
    }

    fn insert(&mut self, container: ItemContainer<T>) -> Result<usize> {
        let index = self.insertion_point(&container.value);
        self.sorted.insert(index, container)?;
        Ok(index)
    }

    /// Find the element with `id`, whose value sorts like `value`.
    ///
    /// Walks the run of elements order-equal to `value`; if the element drifted
    /// out of place, falls back to a full scan.
    fn locate(&self, id: ItemId, value: &T) -> Option<usize> {
        let start = self.insertion_point(value);
        self.sorted[start..]
            .iter()
            .take_while(|c| !self.order.is_less(value, &c.value))
            .position(|c| c.id == id)
            .map(|offset| start + offset)
            .or_else(|| self.position(id))
    }

    fn position(&self, id: ItemId) -> Option<usize> {
        self.sorted.iter().position(|c| c.id == id)
    }

    fn sort(&mut self) {
        let order = self.order.clone();
        self.sorted
            .sort_by(|a, b| compare(order.as_ref(), &a.value, &b.value));
    }

    /// Re-position one element after it mutated. Returns `(from, to)` if it moved.
    fn reposition(&mut self, id: ItemId) -> Result<Option<(usize, usize)>> {
        let Some(from) = self.position(id) else {
            return Ok(None);
        };
        // Search with the element's own slot masked out.
        let container = self.sorted.remove(from)?;
        let to = self.insertion_point(&container.value);
        self.sorted.insert(to, container)?;
        Ok((from != to).then_some((from, to)))
    }

    fn mirror_slice(&self, start: usize, count: usize) -> Result<Vec<ItemId>> {
        self.mirror
            .get(start..start.saturating_add(count))
            .map(<[ItemId]>::to_vec)
            .ok_or_else(|| {
                CollectionError::out_of_range(start.saturating_add(count), self.mirror.len())
            })
    }
}

impl<T: Element + MutableObject> OrderList<T> {
    pub fn new(upstream: SharedList<T>, reference: OrderReference<T>) -> Result<Arc<Self>> {
        let monitor = upstream.monitor().clone();
        if let Some(reference_monitor) = reference.monitor() {
            ensure_same_monitor(&monitor, reference_monitor, "order reference")?;
        }
        let _guard = monitor.acquire_write();
        let values = upstream.to_vec();

        let list = Arc::new_cyclic(|weak: &Weak<Self>| {
            let mut state = OrderState::new(reference.get());
            for value in values {
                let container = ItemContainer::new(value, weak, Self::on_item_mutated);
                state.mirror.push(container.id);
                state.sorted.push(container);
            }
            state.sort();
            Self {
                monitor: monitor.clone(),
                link: UpstreamLink::new(upstream, weak.clone(), Self::on_upstream),
                reference: reference.clone(),
                reference_subscription: Mutex::new(None),
                state: Mutex::new(state),
                observers: ObserverRegistry::new(),
                weak_self: weak.clone(),
            }
        });

        list.link.attach()?;
        let weak = Arc::downgrade(&list);
        let subscription = reference.subscribe(Arc::new(
            move |change: &ReferenceChange<SharedOrder<T>>| match weak.upgrade() {
                Some(list) => list.set_order(change.current.clone()),
                None => Ok(()),
            },
        ));
        *list.reference_subscription.lock() = Some(subscription);

        tracing::debug!(len = list.len(), "order linked");
        Ok(list)
    }

    /// Swap the comparator and re-sort, bracketed by `Resetting`/`Reset`.
    pub fn set_order(&self, order: SharedOrder<T>) -> Result<()> {
        let _guard = self.monitor.acquire_write();
        tracing::debug!("order reconfigured");
        self.notify(ListEvent::Resetting)?;
        {
            let mut state = self.state.lock();
            state.order = order;
            state.sort();
        }
        self.notify(ListEvent::Reset)
    }

    fn notify(&self, event: ListEvent) -> Result<()> {
        self.observers.notify(event)
    }

    fn container(&self, value: T) -> ItemContainer<T> {
        ItemContainer::new(value, &self.weak_self, Self::on_item_mutated)
    }

    fn on_upstream(&self, event: ListEvent) -> Result<()> {
        match event {
            ListEvent::Added { start, count } => self.on_added(start, count),
            ListEvent::Removing { start, count } => {
                let values = self.link.read(start, count)?;
                let ids = self.state.lock().mirror.remove_range(start, count)?;
                self.remove_items(ids, values)
            }
            ListEvent::Changing { start, count } => {
                let values = self.link.read(start, count)?;
                let ids = self.state.lock().mirror_slice(start, count)?;
                self.remove_items(ids, values)
            }
            ListEvent::Changed { start, count } => self.on_changed(start, count),
            ListEvent::Moved { from, to, count } => {
                self.state.lock().mirror.move_range(from, to, count)
            }
            ListEvent::Reset => self.on_reset(),
            ListEvent::Removed { .. } | ListEvent::Resetting => Ok(()),
        }
    }

    fn on_added(&self, start: usize, count: usize) -> Result<()> {
        let values = self.link.read(start, count)?;
        let containers: Vec<_> = values.into_iter().map(|v| self.container(v)).collect();
        self.state
            .lock()
            .mirror
            .insert_all(start, containers.iter().map(|c| c.id))?;
        for container in containers {
            self.insert_item(container)?;
        }
        Ok(())
    }

    fn on_changed(&self, start: usize, count: usize) -> Result<()> {
        let values = self.link.read(start, count)?;
        for (offset, value) in values.into_iter().enumerate() {
            let container = self.container(value);
            {
                let mut state = self.state.lock();
                let len = state.mirror.len();
                let slot = state
                    .mirror
                    .get_mut(start + offset)
                    .ok_or_else(|| CollectionError::out_of_range(start + offset, len))?;
                *slot = container.id;
            }
            self.insert_item(container)?;
        }
        Ok(())
    }

    fn insert_item(&self, container: ItemContainer<T>) -> Result<()> {
        let index = self.state.lock().insert(container)?;
        self.notify(ListEvent::Added {
            start: index,
            count: 1,
        })
    }

    /// Remove each element, one `Removing`/`Removed` pair per element.
    fn remove_items(&self, ids: Vec<ItemId>, values: Vec<T>) -> Result<()> {
        for (id, value) in ids.into_iter().zip(values) {
            let Some(index) = self.state.lock().locate(id, &value) else {
                continue;
            };
            self.notify(ListEvent::Removing {
                start: index,
                count: 1,
            })?;
            self.state.lock().sorted.remove(index)?;
            self.notify(ListEvent::Removed {
                start: index,
                count: 1,
            })?;
        }
        Ok(())
    }

    fn on_reset(&self) -> Result<()> {
        let values = self.link.upstream().to_vec();
        let containers: Vec<_> = values.into_iter().map(|v| self.container(v)).collect();
        self.notify(ListEvent::Resetting)?;
        {
            let mut state = self.state.lock();
            state.mirror = containers.iter().map(|c| c.id).collect();
            state.sorted = containers.into_iter().collect();
            state.sort();
        }
        self.notify(ListEvent::Reset)
    }

    fn on_item_mutated(&self, id: ItemId) -> Result<()> {
        let _guard = self.monitor.acquire_write();
        let moved = self.state.lock().reposition(id)?;
        match moved {
            Some((from, to)) => self.notify(ListEvent::Moved { from, to, count: 1 }),
            None => Ok(()),
        }
    }
}

impl<T: Element + MutableObject> ObservableList<T> for OrderList<T> {
    fn get(&self, index: usize) -> Result<T> {
        let _guard = self.monitor.acquire_read();
        let state = self.state.lock();
        state.sorted.get_checked(index).map(|c| c.value.clone())
    }

    fn len(&self) -> usize {
        let _guard = self.monitor.acquire_read();
        self.state.lock().sorted.len()
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

impl<T: Element + MutableObject> Linked for OrderList<T> {
    fn unlink(&self) {
        let _guard = self.monitor.acquire_write();
        let detached = self.link.detach();
        if let Some(subscription) = self.reference_subscription.lock().take() {
            self.reference.unsubscribe(subscription);
        }
        self.state
            .lock()
            .sorted
            .iter_mut()
            .for_each(ItemContainer::release);
        if detached {
            tracing::debug!("order unlinked");
        }
    }
}

impl<T: Element + MutableObject> Drop for OrderList<T> {
    fn drop(&mut self) {
        self.unlink();
    }
}
