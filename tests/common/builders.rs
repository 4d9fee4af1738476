//! Pipeline fixtures for integration tests

use super::Counter;
use listflow::list::{fixed_order, MutableList, MutableReference, SharedFilter};
use listflow::sync::SharedMonitor;
use listflow::{PipelineBuilder, SharedList, Trigger};
use std::sync::Arc;

/// Source list of counters with an even-only filter and ascending order on top.
pub struct CounterPipeline {
    pub source: Arc<MutableList<Arc<Counter>>>,
    pub filter: Arc<MutableReference<SharedFilter<Arc<Counter>>>>,
    pub filtered: SharedList<Arc<Counter>>,
    pub sorted: SharedList<Arc<Counter>>,
    pub unlinker: Arc<Trigger>,
}

pub struct CounterPipelineBuilder {
    monitor: SharedMonitor,
    values: Vec<i64>,
}

impl CounterPipelineBuilder {
    pub fn new(monitor: SharedMonitor) -> Self {
        Self {
            monitor,
            values: Vec::new(),
        }
    }

    pub fn values(mut self, values: &[i64]) -> Self {
        self.values = values.to_vec();
        self
    }

    pub fn build(self) -> CounterPipeline {
        let unlinker = Trigger::new();
        let builder = PipelineBuilder::new(self.monitor.clone()).unlinker(unlinker.clone());
        let source = builder.new_list(self.values.iter().map(|v| Counter::new(*v)).collect());

        let even: SharedFilter<Arc<Counter>> = Arc::new(|c: &Arc<Counter>| c.get() % 2 == 0);
        let filter = MutableReference::new(even, self.monitor.clone());

        let filtered = builder
            .source(source.clone())
            .filter(filter.clone())
            .expect("filter links")
            .build();
        let sorted = builder
            .source(filtered.clone())
            .order(fixed_order(|a: &Arc<Counter>, b: &Arc<Counter>| a.get() < b.get()))
            .expect("order links")
            .build();

        CounterPipeline {
            source,
            filter,
            filtered,
            sorted,
            unlinker,
        }
    }
}

/// A pass-everything filter, handy for swapping into a [`CounterPipeline`].
pub fn accept_all() -> SharedFilter<Arc<Counter>> {
    Arc::new(|_: &Arc<Counter>| true)
}
