//! Operator pipelines built over observable lists.
//!
//! A pipeline is a chain of operators rooted at one or more lists. Every
//! operator keeps its own materialized projection of its upstream and emits
//! events describing how that projection changed.
//!
//! ```text
//! [MutableList] ──► [Filter] ──► [Order] ──► [Map] ──► [Dispatch] ──► consumer
//! [MutableList] ──┐
//! [MutableList] ──┴► [Merge] ──► ...
//! ```
//!
//! # Design
//!
//! - **One monitor per pipeline**: a mutation holds the write guard for its
//!   full depth-first propagation, so readers never see a half-applied change.
//! - **Weak upstream edges**: upstream registries reach operators through
//!   `Weak`, so dropping an operator detaches it.
//! - **Dispatch is the only deferral point**: everything else propagates
//!   synchronously on the mutating thread.

pub mod builder;
pub(crate) mod container;
pub mod dispatcher;
pub(crate) mod link;
pub mod nodes;

pub use builder::{ListBuilder, PipelineBuilder};
pub use dispatcher::{
    channel, ChannelDispatcher, Dispatcher, InlineDispatcher, SharedDispatcher, WorkQueue,
    WorkUnit,
};
pub use nodes::{DispatchList, FilterList, MapList, Mapper, MergeList, OrderList};
