//! FilterList: predicate-driven projection of an upstream list.
//!
//! Every upstream element lives in exactly one partition: `visible` (passes the
//! current predicate, indexable by downstream) or `hidden` (fails it, keyed by
//! identity). A private mirror of the upstream order maps upstream indices to
//! element identities, so duplicate values are tracked individually.
//!
//! Replacing a range upstream (`Changing`/`Changed`) reuses the visible slots
//! the old elements occupied: passing replacements land in those slots and are
//! reported as single-element changes, surplus replacements are appended, and
//! slots nobody reused are removed as coalesced runs.

use crate::error::{CollectionError, Result};
use crate::list::event::ListEvent;
use crate::list::id::{ItemId, SubscriptionId};
use crate::list::item::{Element, MutableObject};
use crate::list::mutable::ObservableList;
use crate::list::observer::{ListObserver, ObserverRegistry};
use crate::list::range::{Range, RangeCoalescer};
use crate::list::reference::{FilterReference, ReferenceChange, SharedFilter};
use crate::list::source_set::SharedList;
use crate::list::store::OrderedStore;
use crate::list::trigger::Linked;
use crate::pipeline::container::ItemContainer;
use crate::pipeline::link::UpstreamLink;
use crate::sync::{ensure_same_monitor, SharedMonitor};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Weak};

pub struct FilterList<T: Element + MutableObject> {
    monitor: SharedMonitor,
    link: UpstreamLink<T>,
    reference: FilterReference<T>,
    reference_subscription: Mutex<Option<SubscriptionId>>,
    state: Mutex<FilterState<T>>,
    observers: ObserverRegistry,
    weak_self: Weak<Self>,
}

struct FilterState<T: MutableObject> {
    filter: SharedFilter<T>,
    /// Upstream order, by identity.
    mirror: OrderedStore<ItemId>,
    visible: OrderedStore<ItemContainer<T>>,
    hidden: HashMap<ItemId, ItemContainer<T>>,
    /// Visible slots vacated by an upstream `Changing`, waiting for `Changed`.
    pending: BTreeSet<usize>,
}

/// Effect of re-evaluating one element after it mutated.
enum Reevaluation {
    Unchanged,
    Shown(usize),
    Hidden(usize),
}

/// Work left after an upstream `Changed` was classified.
struct Replacement<T: MutableObject> {
    reused: Vec<(usize, ItemContainer<T>)>,
    appended: Vec<ItemContainer<T>>,
    vacated: Vec<usize>,
}

impl<T: MutableObject> FilterState<T> {
    fn new(filter: SharedFilter<T>) -> Self {
        Self {
            filter,
            mirror: OrderedStore::new(),
            visible: OrderedStore::new(),
            hidden: HashMap::new(),
            pending: BTreeSet::new(),
        }
    }

    /// Put a container in the partition its value belongs to.
    fn place(&mut self, container: ItemContainer<T>) -> bool {
        if self.filter.accept(&container.value) {
            self.visible.push(container);
            true
        } else {
            self.hidden.insert(container.id, container);
            false
        }
    }

    fn visible_index(&self, id: ItemId) -> Option<usize> {
        self.visible.iter().position(|c| c.id == id)
    }

    fn mirror_slice(&self, start: usize, count: usize) -> Result<Vec<ItemId>> {
        self.mirror
            .get(start..start.saturating_add(count))
            .map(<[ItemId]>::to_vec)
            .ok_or_else(|| {
                CollectionError::out_of_range(start.saturating_add(count), self.mirror.len())
            })
    }

    /// Rebuild both partitions against the current predicate, visible elements
    /// coming out in upstream order.
    fn reclassify(&mut self) {
        let mut all = std::mem::take(&mut self.hidden);
        all.extend(self.visible.take_all().into_iter().map(|c| (c.id, c)));
        let order = self.mirror.to_vec();
        for id in order {
            if let Some(container) = all.remove(&id) {
                self.place(container);
            }
        }
    }

    fn reevaluate(&mut self, id: ItemId) -> Reevaluation {
        if let Some(container) = self.hidden.get(&id) {
            if !self.filter.accept(&container.value) {
                return Reevaluation::Unchanged;
            }
            if let Some(container) = self.hidden.remove(&id) {
                self.visible.push(container);
            }
            return Reevaluation::Shown(self.visible.len() - 1);
        }
        match self.visible_index(id) {
            Some(index) if !self.filter.accept(&self.visible[index].value) => {
                Reevaluation::Hidden(index)
            }
            _ => Reevaluation::Unchanged,
        }
    }

    fn release_all(&mut self) {
        self.visible.iter_mut().for_each(ItemContainer::release);
        self.hidden.values_mut().for_each(ItemContainer::release);
    }
}

impl<T: Element + MutableObject> FilterList<T> {
    /// Link a new filter to `upstream`, seeded with the upstream's current
    /// contents and kept in sync with `reference`.
    pub fn new(upstream: SharedList<T>, reference: FilterReference<T>) -> Result<Arc<Self>> {
        let monitor = upstream.monitor().clone();
        if let Some(reference_monitor) = reference.monitor() {
            ensure_same_monitor(&monitor, reference_monitor, "filter reference")?;
        }
        let _guard = monitor.acquire_write();
        let values = upstream.to_vec();

        let list = Arc::new_cyclic(|weak: &Weak<Self>| {
            let mut state = FilterState::new(reference.get());
            for value in values {
                let container = ItemContainer::new(value, weak, Self::on_item_mutated);
                state.mirror.push(container.id);
                state.place(container);
            }
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
            move |change: &ReferenceChange<SharedFilter<T>>| match weak.upgrade() {
                Some(list) => list.set_filter(change.current.clone()),
                None => Ok(()),
            },
        ));
        *list.reference_subscription.lock() = Some(subscription);

        let (visible, hidden) = (list.len(), list.hidden_len());
        tracing::debug!(visible, hidden, "filter linked");
        Ok(list)
    }

    /// Number of upstream elements currently failing the predicate.
    pub fn hidden_len(&self) -> usize {
        let _guard = self.monitor.acquire_read();
        self.state.lock().hidden.len()
    }

    /// Swap the predicate and reclassify every element.
    ///
    /// Emits `Resetting`/`Reset` around the reclassification.
    pub fn set_filter(&self, filter: SharedFilter<T>) -> Result<()> {
        let _guard = self.monitor.acquire_write();
        tracing::debug!("filter reconfigured");
        self.notify(ListEvent::Resetting)?;
        {
            let mut state = self.state.lock();
            state.filter = filter;
            state.reclassify();
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
            ListEvent::Removing { start, count } => self.on_removing(start, count),
            ListEvent::Changing { start, count } => self.on_changing(start, count),
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
        let (first, added) = {
            let mut state = self.state.lock();
            state
                .mirror
                .insert_all(start, containers.iter().map(|c| c.id))?;
            let first = state.visible.len();
            for container in containers {
                state.place(container);
            }
            (first, state.visible.len() - first)
        };
        if added == 0 {
            return Ok(());
        }
        self.notify(ListEvent::Added {
            start: first,
            count: added,
        })
    }

    fn on_removing(&self, start: usize, count: usize) -> Result<()> {
        let runs = {
            let mut state = self.state.lock();
            let ids = state.mirror.remove_range(start, count)?;
            let mut positions = BTreeSet::new();
            for id in ids {
                if state.hidden.remove(&id).is_some() {
                    continue;
                }
                if let Some(index) = state.visible_index(id) {
                    positions.insert(index);
                }
            }
            RangeCoalescer::coalesce(positions)
        };
        self.remove_runs(runs)
    }

    /// Remove ascending runs of visible indices, each reported as one pair.
    ///
    /// Run positions are pre-removal indices; every emitted range is shifted
    /// by the length of the runs already removed.
    fn remove_runs(&self, runs: Vec<Range>) -> Result<()> {
        let mut shift = 0;
        for run in runs {
            let start = run.start() - shift;
            let count = run.len();
            self.notify(ListEvent::Removing { start, count })?;
            self.state.lock().visible.remove_range(start, count)?;
            self.notify(ListEvent::Removed { start, count })?;
            shift += count;
        }
        Ok(())
    }

    fn on_changing(&self, start: usize, count: usize) -> Result<()> {
        let mut state = self.state.lock();
        let ids = state.mirror_slice(start, count)?;
        for id in ids {
            if state.hidden.remove(&id).is_some() {
                continue;
            }
            if let Some(index) = state.visible_index(id) {
                state.visible[index].release();
                state.pending.insert(index);
            }
        }
        Ok(())
    }

    fn on_changed(&self, start: usize, count: usize) -> Result<()> {
        let values = self.link.read(start, count)?;
        let plan = {
            let mut state = self.state.lock();
            if start + count > state.mirror.len() {
                return Err(CollectionError::out_of_range(
                    start + count,
                    state.mirror.len(),
                ));
            }
            let mut plan = Replacement {
                reused: Vec::new(),
                appended: Vec::new(),
                vacated: Vec::new(),
            };
            for (offset, value) in values.into_iter().enumerate() {
                let container = self.container(value);
                state.mirror[start + offset] = container.id;
                if !state.filter.accept(&container.value) {
                    state.hidden.insert(container.id, container);
                    continue;
                }
                match state.pending.pop_first() {
                    Some(slot) => plan.reused.push((slot, container)),
                    None => plan.appended.push(container),
                }
            }
            plan.vacated = std::mem::take(&mut state.pending).into_iter().collect();
            plan
        };

        for (slot, container) in plan.reused {
            self.notify(ListEvent::Changing {
                start: slot,
                count: 1,
            })?;
            self.state.lock().visible.set(slot, container)?;
            self.notify(ListEvent::Changed {
                start: slot,
                count: 1,
            })?;
        }

        if !plan.appended.is_empty() {
            let count = plan.appended.len();
            let first = {
                let mut state = self.state.lock();
                let first = state.visible.len();
                state.visible.extend(plan.appended);
                first
            };
            self.notify(ListEvent::Added {
                start: first,
                count,
            })?;
        }

        self.remove_runs(RangeCoalescer::coalesce(plan.vacated))
    }

    fn on_reset(&self) -> Result<()> {
        let values = self.link.upstream().to_vec();
        let containers: Vec<_> = values.into_iter().map(|v| self.container(v)).collect();
        self.notify(ListEvent::Resetting)?;
        {
            let mut state = self.state.lock();
            state.visible.clear();
            state.hidden.clear();
            state.pending.clear();
            state.mirror = containers.iter().map(|c| c.id).collect();
            for container in containers {
                state.place(container);
            }
        }
        self.notify(ListEvent::Reset)
    }

    fn on_item_mutated(&self, id: ItemId) -> Result<()> {
        let _guard = self.monitor.acquire_write();
        let outcome = self.state.lock().reevaluate(id);
        match outcome {
            Reevaluation::Unchanged => Ok(()),
            Reevaluation::Shown(index) => self.notify(ListEvent::Added {
                start: index,
                count: 1,
            }),
            Reevaluation::Hidden(index) => {
                self.notify(ListEvent::Removing {
                    start: index,
                    count: 1,
                })?;
                {
                    let mut state = self.state.lock();
                    let container = state.visible.remove(index)?;
                    state.hidden.insert(container.id, container);
                }
                self.notify(ListEvent::Removed {
                    start: index,
                    count: 1,
                })
            }
        }
    }
}

impl<T: Element + MutableObject> ObservableList<T> for FilterList<T> {
    fn get(&self, index: usize) -> Result<T> {
        let _guard = self.monitor.acquire_read();
        let state = self.state.lock();
        state.visible.get_checked(index).map(|c| c.value.clone())
    }

    fn len(&self) -> usize {
        let _guard = self.monitor.acquire_read();
        self.state.lock().visible.len()
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

impl<T: Element + MutableObject> Linked for FilterList<T> {
    fn unlink(&self) {
        let _guard = self.monitor.acquire_write();
        let detached = self.link.detach();
        if let Some(subscription) = self.reference_subscription.lock().take() {
            self.reference.unsubscribe(subscription);
        }
        self.state.lock().release_all();
        if detached {
            tracing::debug!("filter unlinked");
        }
    }
}

impl<T: Element + MutableObject> Drop for FilterList<T> {
    fn drop(&mut self) {
        self.unlink();
    }
}
