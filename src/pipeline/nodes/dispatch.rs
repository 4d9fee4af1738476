//! DispatchList: replays upstream changes on another execution context.
//!
//! Upstream events are turned into units of work and posted to a
//! [`Dispatcher`](crate::pipeline::dispatcher::Dispatcher) in event order.
//! Values a unit needs are read from the upstream when the event arrives, so a
//! unit never observes upstream state newer than its own event. The local store
//! and observers are touched only when a unit runs, under this list's own
//! monitor rather than the upstream's.

use crate::error::Result;
use crate::list::event::ListEvent;
use crate::list::item::Element;
use crate::list::mutable::ObservableList;
use crate::list::observer::{ListObserver, ObserverRegistry};
use crate::list::source_set::SharedList;
use crate::list::store::OrderedStore;
use crate::list::trigger::Linked;
use crate::pipeline::dispatcher::SharedDispatcher;
use crate::pipeline::link::UpstreamLink;
use crate::sync::SharedMonitor;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

pub struct DispatchList<T: Element> {
    /// Guards `store` against readers on other threads while units run.
    monitor: SharedMonitor,
    link: UpstreamLink<T>,
    dispatcher: SharedDispatcher,
    store: Mutex<OrderedStore<T>>,
    observers: ObserverRegistry,
    weak_self: Weak<Self>,
}

impl<T: Element> DispatchList<T> {
    /// Follow `upstream`, replaying its changes through `dispatcher`. `monitor`
    /// guards the replayed side; it is what [`ObservableList::monitor`] returns.
    ///
    /// A non-empty upstream posts one initial unit that installs the snapshot
    /// and emits `Added(0, n)`.
    pub fn new(
        upstream: SharedList<T>,
        dispatcher: SharedDispatcher,
        monitor: SharedMonitor,
    ) -> Result<Arc<Self>> {
        let upstream_monitor = upstream.monitor().clone();
        let _guard = upstream_monitor.acquire_write();
        let snapshot = upstream.to_vec();

        let list = Arc::new_cyclic(|weak: &Weak<Self>| Self {
            monitor,
            link: UpstreamLink::new(upstream, weak.clone(), Self::on_upstream),
            dispatcher,
            store: Mutex::new(OrderedStore::new()),
            observers: ObserverRegistry::new(),
            weak_self: weak.clone(),
        });
        list.link.attach()?;

        let count = snapshot.len();
        if count > 0 {
            list.post(move |list| {
                list.store.lock().insert_all(0, snapshot)?;
                list.notify(ListEvent::Added { start: 0, count })
            });
        }
        tracing::debug!(snapshot = count, "dispatch linked");
        Ok(list)
    }

    fn notify(&self, event: ListEvent) -> Result<()> {
        self.observers.notify(event)
    }

    /// Post `apply` to run against this list under its own write guard.
    fn post<F>(&self, apply: F)
    where
        F: FnOnce(&Self) -> Result<()> + Send + 'static,
    {
        let weak = self.weak_self.clone();
        self.dispatcher.dispatch(Box::new(move || {
            let Some(list) = weak.upgrade() else {
                tracing::warn!("dispatch target dropped before its unit ran");
                return;
            };
            let _guard = list.monitor.acquire_write();
            if let Err(err) = apply(&list) {
                tracing::error!(%err, "dispatched unit failed to apply");
            }
        }));
    }

    fn on_upstream(&self, event: ListEvent) -> Result<()> {
        match event {
            ListEvent::Added { start, count } => {
                let values = self.link.read(start, count)?;
                self.post(move |list| {
                    list.store.lock().insert_all(start, values)?;
                    list.notify(event)
                });
            }
            ListEvent::Changing { .. } | ListEvent::Removed { .. } => {}
            ListEvent::Changed { start, count } => {
                let values = self.link.read(start, count)?;
                self.post(move |list| {
                    list.notify(ListEvent::Changing { start, count })?;
                    list.store.lock().set_all(start, values)?;
                    list.notify(event)
                });
            }
            ListEvent::Removing { start, count } => {
                self.post(move |list| {
                    list.notify(event)?;
                    list.store.lock().remove_range(start, count)?;
                    list.notify(ListEvent::Removed { start, count })
                });
            }
            ListEvent::Moved { from, to, count } => {
                self.post(move |list| {
                    list.store.lock().move_range(from, to, count)?;
                    list.notify(event)
                });
            }
            ListEvent::Resetting => self.post(move |list| list.notify(event)),
            ListEvent::Reset => {
                let values: OrderedStore<T> = self.link.upstream().to_vec().into();
                self.post(move |list| {
                    *list.store.lock() = values;
                    list.notify(event)
                });
            }
        }
        Ok(())
    }
}

impl<T: Element> ObservableList<T> for DispatchList<T> {
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

impl<T: Element> Linked for DispatchList<T> {
    /// Stop following the upstream. Units already posted still run.
    fn unlink(&self) {
        let upstream_monitor = self.link.upstream().monitor().clone();
        let _guard = upstream_monitor.acquire_write();
        if self.link.detach() {
            tracing::debug!("dispatch unlinked");
        }
    }
}

impl<T: Element> Drop for DispatchList<T> {
    fn drop(&mut self) {
        self.unlink();
    }
}
