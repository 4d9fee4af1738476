//! Snapshot-delivered callback sets.
//!
//! Used by element mutation signals, observable references, triggers and
//! source sets. Delivery runs against a copy of the subscriber list taken at
//! the start of the call, so callbacks may subscribe or unsubscribe freely.

use crate::error::{CollectionError, Result};
use crate::list::id::SubscriptionId;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Callback stored in a [`ListenerSet`].
pub type Listener<A> = Arc<dyn Fn(&A) -> Result<()> + Send + Sync>;

pub struct ListenerSet<A: ?Sized> {
    entries: Mutex<Vec<(SubscriptionId, Listener<A>)>>,
}

impl<A: ?Sized> ListenerSet<A> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, listener: Listener<A>) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.entries.lock().push((id, listener));
        id
    }

    /// Like [`subscribe`](Self::subscribe), but rejects a listener whose `Arc`
    /// is already subscribed.
    pub fn subscribe_unique(&self, listener: Listener<A>) -> Result<SubscriptionId> {
        let mut entries = self.entries.lock();
        if entries
            .iter()
            .any(|(_, existing)| std::ptr::addr_eq(Arc::as_ptr(existing), Arc::as_ptr(&listener)))
        {
            return Err(CollectionError::DuplicateRegistration("listener"));
        }
        let id = SubscriptionId::next();
        entries.push((id, listener));
        Ok(id)
    }

    /// Returns false when `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(entry, _)| *entry != id);
        entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Call every listener with `arg`, stopping at the first error.
    pub fn emit(&self, arg: &A) -> Result<()> {
        let snapshot: Vec<Listener<A>> = self
            .entries
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in snapshot {
            listener(arg)?;
        }
        Ok(())
    }
}

impl<A: ?Sized> Default for ListenerSet<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ?Sized> fmt::Debug for ListenerSet<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.len())
            .finish()
    }
}
