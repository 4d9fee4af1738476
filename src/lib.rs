//! # listflow: incremental observable list pipelines
//!
//! A [`MutableList`](list::MutableList) publishes fine-grained change events
//! (added, changed, removed, moved, reset). Operators built on top of it keep
//! their own materialized projection of an upstream list and republish the
//! equivalent events for that projection:
//!
//! - **Filter**: the elements accepted by a predicate, in upstream order
//! - **Order**: the elements sorted by a "less than" relation
//! - **Map**: an element-wise projection
//! - **Merge**: the concatenation of a dynamic set of lists
//! - **Dispatch**: a replica updated on another execution context
//!
//! ## Concurrency
//!
//! A pipeline shares one [`Monitor`](sync::Monitor). A mutation holds its write
//! guard for the whole synchronous propagation through every operator, so a
//! reader observes either the state before a mutation or the state after it.
//!
//! ## Example
//!
//! ```ignore
//! use listflow::{fixed_filter, fixed_order, ListMutator, ObservableList, PipelineBuilder};
//! use listflow::sync::ReadWriteMonitor;
//!
//! let builder = PipelineBuilder::new(ReadWriteMonitor::shared());
//! let numbers = builder.new_list(vec![5, 2, 9, 4]);
//! let evens = builder
//!     .source(numbers.clone())
//!     .filter(fixed_filter(|v: &i32| v % 2 == 0))?
//!     .order(fixed_order(|a: &i32, b: &i32| a < b))?
//!     .build();
//!
//! numbers.add(0)?;
//! assert_eq!(evens.to_vec(), vec![0, 2, 4]);
//! ```

pub mod config;
pub mod error;
pub mod list;
pub mod pipeline;
pub mod sync;

// Re-export commonly used types
pub use config::{ConfigError, EngineConfig, MonitorKind};
pub use error::{CollectionError, Result};
pub use list::{
    fixed_filter, fixed_order, observer_fn, Element, ListEvent, ListMutator, ListObserver,
    MutableList, MutableObject, MutableReference, MutationSignal, MutatorFanOut, ObservableList,
    SharedList, SourceSet, Trigger,
};
pub use pipeline::{ListBuilder, PipelineBuilder};
