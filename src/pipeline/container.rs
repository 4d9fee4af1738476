//! Identity-carrying element wrapper used by Filter and Order.

use crate::error::Result;
use crate::list::id::{ItemId, SubscriptionId};
use crate::list::item::{MutableObject, MutationCallback};
use std::fmt;
use std::sync::{Arc, Weak};

/// One upstream element plus its mutation subscription.
///
/// Two containers are the same element only if their ids match, whatever the
/// wrapped values compare as. Dropping a container unsubscribes it.
pub(crate) struct ItemContainer<T: MutableObject> {
    pub(crate) id: ItemId,
    pub(crate) value: T,
    subscription: Option<SubscriptionId>,
}

impl<T: MutableObject> ItemContainer<T> {
    /// Wrap `value`, subscribing `handler` on `owner` if the value can mutate.
    pub(crate) fn new<O>(value: T, owner: &Weak<O>, handler: fn(&O, ItemId) -> Result<()>) -> Self
    where
        O: Send + Sync + 'static,
    {
        let id = ItemId::next();
        let subscription = value.mutation_signal().map(|signal| {
            let owner = owner.clone();
            let callback: MutationCallback = Arc::new(move |_: &()| match owner.upgrade() {
                Some(owner) => handler(&owner, id),
                None => Ok(()),
            });
            signal.subscribe(callback)
        });
        Self {
            id,
            value,
            subscription,
        }
    }

    /// Drop the mutation subscription, keeping the value.
    pub(crate) fn release(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            if let Some(signal) = self.value.mutation_signal() {
                signal.unsubscribe(subscription);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }
}

impl<T: MutableObject> Drop for ItemContainer<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T: MutableObject> fmt::Debug for ItemContainer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemContainer")
            .field("id", &self.id)
            .field("subscribed", &self.subscription.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::item::MutationSignal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Cell {
        signal: MutationSignal,
    }

    impl MutableObject for Cell {
        fn mutation_signal(&self) -> Option<&MutationSignal> {
            Some(&self.signal)
        }
    }

    #[derive(Default)]
    struct Owner {
        hits: AtomicUsize,
    }

    fn on_mutated(owner: &Owner, _id: ItemId) -> Result<()> {
        owner.hits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    #[test]
    fn test_subscription_follows_container_lifetime() {
        let owner = Arc::new(Owner::default());
        let cell = Arc::new(Cell {
            signal: MutationSignal::new(),
        });

        let container = ItemContainer::new(cell.clone(), &Arc::downgrade(&owner), on_mutated);
        assert!(container.is_subscribed());
        cell.signal.notify_mutated().unwrap();
        assert_eq!(owner.hits.load(Ordering::SeqCst), 1);

        drop(container);
        assert_eq!(cell.signal.subscriber_count(), 0);
        cell.signal.notify_mutated().unwrap();
        assert_eq!(owner.hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_plain_values_are_not_subscribed() {
        let owner = Arc::new(Owner::default());
        let a = ItemContainer::new(7, &Arc::downgrade(&owner), on_mutated);
        let b = ItemContainer::new(7, &Arc::downgrade(&owner), on_mutated);
        assert!(!a.is_subscribed());
        assert_ne!(a.id, b.id);
    }
}
