//! Observable list primitives: events, observers, the mutable root list and
//! the small building blocks the operators share.

pub mod event;
pub mod id;
pub mod item;
pub mod mutable;
pub mod observer;
pub mod range;
pub mod reference;
pub mod source_set;
pub mod store;
pub mod trigger;

pub use event::ListEvent;
pub use id::{ItemId, SourceId, SubscriptionId};
pub use item::{Element, MutableObject, MutationSignal};
pub use mutable::{ListMutator, MutableList, MutatorFanOut, ObservableList};
pub use observer::{observer_fn, ListObserver, ObserverRegistry};
pub use range::{Range, RangeCoalescer};
pub use reference::{
    fixed_filter, fixed_order, FilterReference, ImmutableReference, ItemFilter, ItemsOrder,
    MutableReference, ObservableReference, OrderReference, ReferenceChange, SharedFilter,
    SharedOrder,
};
pub use source_set::{SharedList, SourceSet, SourceSetEvent};
pub use store::OrderedStore;
pub use trigger::{Linked, Trigger};
