//! Observer trait and the registry every observable list publishes through.

use crate::error::{CollectionError, Result};
use crate::list::event::ListEvent;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Receiver of list change events.
///
/// Callbacks run synchronously inside the mutation that caused them, with the
/// pipeline's write guard held. An error aborts delivery and is returned to the
/// caller that issued the mutation.
#[cfg_attr(test, mockall::automock)]
pub trait ListObserver: Send + Sync {
    fn on_event(&self, event: ListEvent) -> Result<()>;
}

/// Adapter turning a closure into a [`ListObserver`].
pub struct FnObserver<F> {
    callback: F,
}

impl<F> ListObserver for FnObserver<F>
where
    F: Fn(ListEvent) -> Result<()> + Send + Sync,
{
    fn on_event(&self, event: ListEvent) -> Result<()> {
        (self.callback)(event)
    }
}

/// Wrap a closure as a shareable observer.
///
/// Keep the returned `Arc`: it is the handle needed to remove the observer.
pub fn observer_fn<F>(callback: F) -> Arc<dyn ListObserver>
where
    F: Fn(ListEvent) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(FnObserver { callback })
}

/// Set of observers of one list.
///
/// Observers are identified by the address of their `Arc`; registering the same
/// observer twice is rejected. Delivery runs against a snapshot of the set, so an
/// observer may add or remove observers (itself included) while being notified.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Mutex<Vec<Arc<dyn ListObserver>>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, observer: Arc<dyn ListObserver>) -> Result<()> {
        let mut observers = self.observers.lock();
        if observers.iter().any(|o| same_observer(o, &observer)) {
            return Err(CollectionError::DuplicateRegistration("list observer"));
        }
        observers.push(observer);
        Ok(())
    }

    /// Remove an observer. Returns false if it was not registered.
    pub fn remove(&self, observer: &Arc<dyn ListObserver>) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|o| !same_observer(o, observer));
        observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.observers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.lock().is_empty()
    }

    /// Deliver one event to every observer registered at the time of the call.
    pub fn notify(&self, event: ListEvent) -> Result<()> {
        let snapshot: Vec<Arc<dyn ListObserver>> = self.observers.lock().clone();
        if snapshot.is_empty() {
            return Ok(());
        }
        tracing::trace!(?event, observers = snapshot.len(), "delivering list event");
        for observer in snapshot {
            observer.on_event(event)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.len())
            .finish()
    }
}

fn same_observer(a: &Arc<dyn ListObserver>, b: &Arc<dyn ListObserver>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use mockall::Sequence;

    #[test]
    fn test_duplicate_observer_rejected() {
        let registry = ObserverRegistry::new();
        let observer = observer_fn(|_| Ok(()));
        registry.add(observer.clone()).unwrap();
        assert_eq!(
            registry.add(observer.clone()),
            Err(CollectionError::DuplicateRegistration("list observer"))
        );
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(&observer));
        assert!(!registry.remove(&observer));
    }

    #[test]
    fn test_events_delivered_in_order() {
        let mut mock = MockListObserver::new();
        let mut seq = Sequence::new();
        mock.expect_on_event()
            .with(eq(ListEvent::Removing { start: 1, count: 2 }))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_on_event()
            .with(eq(ListEvent::Removed { start: 1, count: 2 }))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let registry = ObserverRegistry::new();
        registry.add(Arc::new(mock)).unwrap();
        registry
            .notify(ListEvent::Removing { start: 1, count: 2 })
            .unwrap();
        registry
            .notify(ListEvent::Removed { start: 1, count: 2 })
            .unwrap();
    }

    #[test]
    fn test_error_stops_delivery() {
        let registry = ObserverRegistry::new();
        registry
            .add(observer_fn(|_| {
                Err(CollectionError::InvalidArgument("rejected".into()))
            }))
            .unwrap();
        assert!(registry.notify(ListEvent::Reset).is_err());
    }

    #[test]
    fn test_observer_removes_itself_during_delivery() {
        let registry = Arc::new(ObserverRegistry::new());
        let slot: Arc<Mutex<Option<Arc<dyn ListObserver>>>> = Arc::new(Mutex::new(None));

        let inner_registry = registry.clone();
        let inner_slot = slot.clone();
        let observer = observer_fn(move |_| {
            if let Some(me) = inner_slot.lock().take() {
                inner_registry.remove(&me);
            }
            Ok(())
        });
        *slot.lock() = Some(observer.clone());
        registry.add(observer).unwrap();

        registry.notify(ListEvent::Resetting).unwrap();
        assert!(registry.is_empty());
    }
}
