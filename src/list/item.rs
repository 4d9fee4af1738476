//! Optional self-mutation capability of list elements.
//!
//! Filter and Order re-evaluate an element when it reports that it changed in
//! place. Element types opt in by returning a [`MutationSignal`] from
//! [`MutableObject::mutation_signal`]; the default reports no capability.

use crate::error::Result;
use crate::list::id::SubscriptionId;
use crate::sync::ListenerSet;
use std::fmt;
use std::sync::Arc;

/// Bounds every list element satisfies.
pub trait Element: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Element for T {}

/// Capability check for elements that can change in place.
pub trait MutableObject {
    fn mutation_signal(&self) -> Option<&MutationSignal> {
        None
    }
}

/// Callback invoked after an element mutated itself.
pub type MutationCallback = Arc<dyn Fn(&()) -> Result<()> + Send + Sync>;

/// Notification point embedded in a self-mutating element.
#[derive(Default)]
pub struct MutationSignal {
    listeners: ListenerSet<()>,
}

impl MutationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: MutationCallback) -> SubscriptionId {
        self.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    /// Tell every subscriber that the owning element changed.
    ///
    /// Must be called after the change is visible through the element.
    pub fn notify_mutated(&self) -> Result<()> {
        self.listeners.emit(&())
    }
}

impl fmt::Debug for MutationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationSignal")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

macro_rules! immutable_elements {
    ($($ty:ty),* $(,)?) => {
        $(impl MutableObject for $ty {})*
    };
}

immutable_elements!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    String, &'static str,
);

impl<T: MutableObject + ?Sized> MutableObject for Arc<T> {
    fn mutation_signal(&self) -> Option<&MutationSignal> {
        (**self).mutation_signal()
    }
}

impl<T: MutableObject + ?Sized> MutableObject for Box<T> {
    fn mutation_signal(&self) -> Option<&MutationSignal> {
        (**self).mutation_signal()
    }
}

impl<A: MutableObject, B: MutableObject> MutableObject for (A, B) {}
