//! Explicit detachment of operators from their upstream.

use crate::error::Result;
use crate::list::id::SubscriptionId;
use crate::sync::{Listener, ListenerSet};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

/// Something subscribed to an upstream that can be detached from it.
///
/// `unlink` is idempotent. After it returns, no upstream activity reaches the
/// implementor and its contents stay frozen.
pub trait Linked: Send + Sync {
    fn unlink(&self);
}

/// A signal that can be fired any number of times.
///
/// Besides plain listeners, operators can be attached to a trigger: the next
/// `fire` unlinks them and forgets them.
#[derive(Default)]
pub struct Trigger {
    listeners: ListenerSet<Trigger>,
    attached: Mutex<Vec<Weak<dyn Linked>>>,
}

impl Trigger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a listener. The same `Arc` cannot be registered twice.
    pub fn add_listener(&self, listener: Listener<Trigger>) -> Result<SubscriptionId> {
        self.listeners.subscribe_unique(listener)
    }

    pub fn remove_listener(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Attach an operator to be unlinked on the next `fire`.
    ///
    /// Only a weak handle is kept; dropping the operator detaches it anyway.
    pub fn attach(&self, linked: &Arc<dyn Linked>) {
        self.attached.lock().push(Arc::downgrade(linked));
    }

    pub fn attached_count(&self) -> usize {
        self.attached.lock().len()
    }

    /// Run every listener, then unlink and forget every attached operator.
    pub fn fire(&self) -> Result<()> {
        self.listeners.emit(self)?;

        let attached = std::mem::take(&mut *self.attached.lock());
        tracing::debug!(operators = attached.len(), "trigger fired");
        for linked in attached.iter().filter_map(Weak::upgrade) {
            linked.unlink();
        }
        Ok(())
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger")
            .field("listeners", &self.listeners.len())
            .field("attached", &self.attached_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingLink {
        unlinks: AtomicUsize,
    }

    impl Linked for CountingLink {
        fn unlink(&self) {
            self.unlinks.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_fire_unlinks_attached_once() {
        let trigger = Trigger::new();
        let link = Arc::new(CountingLink::default());
        let as_linked: Arc<dyn Linked> = link.clone();
        trigger.attach(&as_linked);

        trigger.fire().unwrap();
        trigger.fire().unwrap();
        assert_eq!(link.unlinks.load(Ordering::SeqCst), 1);
        assert_eq!(trigger.attached_count(), 0);
    }

    #[test]
    fn test_listeners_run_every_fire() {
        let trigger = Trigger::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let listener: Listener<Trigger> = Arc::new(move |_: &Trigger| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let id = trigger.add_listener(listener.clone()).unwrap();
        assert!(trigger.add_listener(listener).is_err());

        trigger.fire().unwrap();
        trigger.fire().unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 2);

        assert!(trigger.remove_listener(id));
        trigger.fire().unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_dropped_operator_is_skipped() {
        let trigger = Trigger::new();
        {
            let link: Arc<dyn Linked> = Arc::new(CountingLink::default());
            trigger.attach(&link);
        }
        trigger.fire().unwrap();
    }
}
