//! Fluent construction of operator chains.
//!
//! ```ignore
//! let visible = PipelineBuilder::new(monitor)
//!     .unlinker(trigger.clone())
//!     .source(list)
//!     .filter(fixed_filter(|t: &Task| !t.done))?
//!     .order(fixed_order(|a: &Task, b: &Task| a.due < b.due))?
//!     .map(|t: &Task| t.title.clone())?
//!     .build();
//! ```
//!
//! Every operator created through a builder that carries an unlinker is
//! attached to it, so firing the trigger detaches the whole chain.

use crate::error::Result;
use crate::list::item::{Element, MutableObject};
use crate::list::mutable::{MutableList, MutatorFanOut, ObservableList};
use crate::list::reference::{FilterReference, OrderReference};
use crate::list::source_set::{SharedList, SourceSet};
use crate::list::trigger::{Linked, Trigger};
use crate::pipeline::dispatcher::SharedDispatcher;
use crate::pipeline::nodes::{DispatchList, FilterList, MapList, MergeList, OrderList};
use crate::sync::{ReadWriteMonitor, SharedMonitor};
use std::sync::Arc;

/// Entry point holding the pipeline monitor and the optional unlinker.
#[derive(Clone)]
pub struct PipelineBuilder {
    monitor: SharedMonitor,
    unlinker: Option<Arc<Trigger>>,
}

impl PipelineBuilder {
    pub fn new(monitor: SharedMonitor) -> Self {
        Self {
            monitor,
            unlinker: None,
        }
    }

    /// Attach every operator built from here on to `trigger`.
    pub fn unlinker(mut self, trigger: Arc<Trigger>) -> Self {
        self.unlinker = Some(trigger);
        self
    }

    pub fn monitor(&self) -> &SharedMonitor {
        &self.monitor
    }

    /// A mutable root list guarded by this builder's monitor.
    pub fn new_list<T: Element>(&self, values: Vec<T>) -> Arc<MutableList<T>> {
        MutableList::from_vec(values, self.monitor.clone())
    }

    pub fn new_source_set<T: Element>(&self) -> Arc<SourceSet<T>> {
        SourceSet::new(self.monitor.clone())
    }

    pub fn new_fan_out<T: Element>(&self) -> Arc<MutatorFanOut<T>> {
        MutatorFanOut::new(self.monitor.clone())
    }

    /// Start a chain from an existing list.
    pub fn source<T: Element>(&self, list: SharedList<T>) -> ListBuilder<T> {
        ListBuilder {
            current: list,
            unlinker: self.unlinker.clone(),
        }
    }

    /// Start a chain from the concatenation of every list in `sources`.
    pub fn merge<T: Element>(&self, sources: &Arc<SourceSet<T>>) -> Result<ListBuilder<T>> {
        let merged = MergeList::new(sources)?;
        Ok(ListBuilder::attached(merged, self.unlinker.clone()))
    }

    /// Start a chain from a new list driven by `fan_out`.
    pub fn mutable<T: Element>(&self, fan_out: &Arc<MutatorFanOut<T>>) -> Result<ListBuilder<T>> {
        let list = MutableList::with_fan_out(fan_out)?;
        Ok(ListBuilder::attached(list, self.unlinker.clone()))
    }
}

/// A chain under construction; `T` is the element type at its current tail.
pub struct ListBuilder<T> {
    current: SharedList<T>,
    unlinker: Option<Arc<Trigger>>,
}

impl<T: Element> ListBuilder<T> {
    /// Wrap a freshly built operator, registering it with the unlinker.
    fn attached<L>(list: Arc<L>, unlinker: Option<Arc<Trigger>>) -> Self
    where
        L: ObservableList<T> + Linked + 'static,
    {
        if let Some(trigger) = &unlinker {
            let linked: Arc<dyn Linked> = list.clone();
            trigger.attach(&linked);
        }
        Self {
            current: list,
            unlinker,
        }
    }

    pub fn filter(self, reference: FilterReference<T>) -> Result<Self>
    where
        T: MutableObject,
    {
        let list = FilterList::new(self.current, reference)?;
        Ok(Self::attached(list, self.unlinker))
    }

    pub fn order(self, reference: OrderReference<T>) -> Result<Self>
    where
        T: MutableObject,
    {
        let list = OrderList::new(self.current, reference)?;
        Ok(Self::attached(list, self.unlinker))
    }

    pub fn map<U, F>(self, mapper: F) -> Result<ListBuilder<U>>
    where
        U: Element,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let list = MapList::new(self.current, Arc::new(mapper))?;
        Ok(ListBuilder::attached(list, self.unlinker))
    }

    /// Replay the chain through `dispatcher`. Downstream operators share the
    /// dispatched side's own monitor.
    pub fn dispatch(self, dispatcher: SharedDispatcher) -> Result<Self> {
        self.dispatch_with_monitor(dispatcher, ReadWriteMonitor::shared())
    }

    pub fn dispatch_with_monitor(
        self,
        dispatcher: SharedDispatcher,
        monitor: SharedMonitor,
    ) -> Result<Self> {
        let list = DispatchList::new(self.current, dispatcher, monitor)?;
        Ok(Self::attached(list, self.unlinker))
    }

    /// The read-only tail of the chain.
    pub fn build(self) -> SharedList<T> {
        self.current
    }
}
