//! MergeList: concatenation of a dynamic set of member lists.
//!
//! Each member has a record holding the offset of its first element in the
//! merged store and its current length. Events from a member are translated by
//! its offset; events that change its length shift the offsets of every member
//! registered after it.

use crate::error::{CollectionError, Result};
use crate::list::event::ListEvent;
use crate::list::id::{SourceId, SubscriptionId};
use crate::list::item::Element;
use crate::list::mutable::ObservableList;
use crate::list::observer::{observer_fn, ListObserver, ObserverRegistry};
use crate::list::source_set::{same_list, SharedList, SourceSet, SourceSetEvent};
use crate::list::store::OrderedStore;
use crate::list::trigger::Linked;
use crate::pipeline::link::read_range;
use crate::sync::{ensure_same_monitor, SharedMonitor};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

pub struct MergeList<T: Element> {
    monitor: SharedMonitor,
    sources: Arc<SourceSet<T>>,
    set_subscription: Mutex<Option<SubscriptionId>>,
    state: Mutex<MergeState<T>>,
    observers: ObserverRegistry,
    weak_self: Weak<Self>,
    unlinked: AtomicBool,
}

struct Member<T> {
    id: SourceId,
    source: SharedList<T>,
    observer: Arc<dyn ListObserver>,
    offset: usize,
    len: usize,
    /// Length captured at `Resetting`, consumed at `Reset`.
    pending_reset: Option<usize>,
}

struct MergeState<T> {
    store: OrderedStore<T>,
    members: Vec<Member<T>>,
}

impl<T> MergeState<T> {
    fn position(&self, id: SourceId) -> Option<usize> {
        self.members.iter().position(|m| m.id == id)
    }

    /// Move every member after `index` by `+added - removed`.
    fn shift_after(&mut self, index: usize, added: usize, removed: usize) {
        for member in &mut self.members[index + 1..] {
            member.offset = member.offset + added - removed;
        }
    }
}

impl<T: Element> MergeList<T> {
    /// Merge every current member of `sources` and follow later membership changes.
    pub fn new(sources: &Arc<SourceSet<T>>) -> Result<Arc<Self>> {
        let monitor = sources.monitor().clone();
        let _guard = monitor.acquire_write();

        let list = Arc::new_cyclic(|weak: &Weak<Self>| Self {
            monitor: monitor.clone(),
            sources: sources.clone(),
            set_subscription: Mutex::new(None),
            state: Mutex::new(MergeState {
                store: OrderedStore::new(),
                members: Vec::new(),
            }),
            observers: ObserverRegistry::new(),
            weak_self: weak.clone(),
            unlinked: AtomicBool::new(false),
        });

        for source in sources.sources() {
            list.add_source(source)?;
        }

        let weak = Arc::downgrade(&list);
        let subscription =
            sources.subscribe(Arc::new(move |event: &SourceSetEvent<T>| {
                let Some(list) = weak.upgrade() else {
                    return Ok(());
                };
                match event {
                    SourceSetEvent::Added(source) => list.add_source(source.clone()),
                    SourceSetEvent::Removed(source) => list.remove_source(source).map(|_| ()),
                }
            }));
        *list.set_subscription.lock() = Some(subscription);

        tracing::debug!(sources = list.source_count(), len = list.len(), "merge linked");
        Ok(list)
    }

    pub fn source_count(&self) -> usize {
        self.state.lock().members.len()
    }

    /// Append `source`'s contents as one range and start following it.
    fn add_source(&self, source: SharedList<T>) -> Result<()> {
        ensure_same_monitor(&self.monitor, source.monitor(), "merge source")?;
        let _guard = self.monitor.acquire_write();
        if self.unlinked.load(Ordering::Acquire) {
            return Ok(());
        }
        if self
            .state
            .lock()
            .members
            .iter()
            .any(|m| same_list(&m.source, &source))
        {
            return Err(CollectionError::DuplicateRegistration("merge source"));
        }

        let id = SourceId::next();
        let weak = self.weak_self.clone();
        let observer = observer_fn(move |event| match weak.upgrade() {
            Some(list) => list.on_member_event(id, event),
            None => Ok(()),
        });
        source.add_observer(observer.clone())?;

        let values = source.to_vec();
        let count = values.len();
        let offset = {
            let mut state = self.state.lock();
            let offset = state.store.len();
            state.store.extend(values);
            state.members.push(Member {
                id,
                source,
                observer,
                offset,
                len: count,
                pending_reset: None,
            });
            offset
        };
        tracing::debug!(%id, offset, count, "merge source added");

        if count == 0 {
            return Ok(());
        }
        self.notify(ListEvent::Added {
            start: offset,
            count,
        })
    }

    /// Stop following `source` and remove its span as one range.
    fn remove_source(&self, source: &SharedList<T>) -> Result<bool> {
        let _guard = self.monitor.acquire_write();
        let (index, member) = {
            let mut state = self.state.lock();
            match state
                .members
                .iter()
                .position(|m| same_list(&m.source, source))
            {
                Some(index) => (index, state.members.remove(index)),
                None => return Ok(false),
            }
        };
        member.source.remove_observer(&member.observer);
        tracing::debug!(id = %member.id, len = member.len, "merge source removed");

        if member.len > 0 {
            let (start, count) = (member.offset, member.len);
            self.notify(ListEvent::Removing { start, count })?;
            {
                let mut state = self.state.lock();
                state.store.remove_range(start, count)?;
                for later in &mut state.members[index..] {
                    later.offset -= count;
                }
            }
            self.notify(ListEvent::Removed { start, count })?;
        }
        Ok(true)
    }

    fn notify(&self, event: ListEvent) -> Result<()> {
        self.observers.notify(event)
    }

    fn on_member_event(&self, id: SourceId, event: ListEvent) -> Result<()> {
        let (index, offset, source) = {
            let state = self.state.lock();
            let Some(index) = state.position(id) else {
                return Ok(());
            };
            let member = &state.members[index];
            (index, member.offset, member.source.clone())
        };

        match event {
            ListEvent::Added { start, count } => {
                let values = read_range(&source, start, count)?;
                {
                    let mut state = self.state.lock();
                    state.store.insert_all(offset + start, values)?;
                    state.members[index].len += count;
                    state.shift_after(index, count, 0);
                }
                self.notify(ListEvent::Added {
                    start: offset + start,
                    count,
                })
            }
            ListEvent::Changing { start, count } => self.notify(ListEvent::Changing {
                start: offset + start,
                count,
            }),
            ListEvent::Changed { start, count } => {
                let values = read_range(&source, start, count)?;
                self.state.lock().store.set_all(offset + start, values)?;
                self.notify(ListEvent::Changed {
                    start: offset + start,
                    count,
                })
            }
            ListEvent::Removing { start, count } => {
                let start = offset + start;
                self.notify(ListEvent::Removing { start, count })?;
                {
                    let mut state = self.state.lock();
                    state.store.remove_range(start, count)?;
                    state.members[index].len -= count;
                    state.shift_after(index, 0, count);
                }
                self.notify(ListEvent::Removed { start, count })
            }
            ListEvent::Removed { .. } => Ok(()),
            ListEvent::Moved { from, to, count } => {
                let (from, to) = (offset + from, offset + to);
                self.state.lock().store.move_range(from, to, count)?;
                self.notify(ListEvent::Moved { from, to, count })
            }
            ListEvent::Resetting => {
                {
                    let mut state = self.state.lock();
                    let member = &mut state.members[index];
                    member.pending_reset = Some(member.len);
                }
                self.notify(ListEvent::Resetting)
            }
            ListEvent::Reset => {
                let values = source.to_vec();
                let new_len = values.len();
                {
                    let mut state = self.state.lock();
                    let member = &mut state.members[index];
                    let old_len = member.pending_reset.take().unwrap_or(member.len);
                    member.len = new_len;
                    state.store.splice(offset, old_len, values)?;
                    state.shift_after(index, new_len, old_len);
                }
                self.notify(ListEvent::Reset)
            }
        }
    }
}

impl<T: Element> ObservableList<T> for MergeList<T> {
    fn get(&self, index: usize) -> Result<T> {
        let _guard = self.monitor.acquire_read();
        self.state.lock().store.get_checked(index).cloned()
    }

    fn len(&self) -> usize {
        let _guard = self.monitor.acquire_read();
        self.state.lock().store.len()
    }

    fn add_observer(&self, observer: Arc<dyn ListObserver>) -> Result<()> {
        let _guard = self.monitor.acquire_write();
        self.observers.add(observer)
    }

    fn remove_observer(&self, observer: &Arc<dyn ListObserver>) -> bool {
        let _guard = self.monitor.acquire_write();
        self.observers.remove(observer)
    }

    fn monitor(&self) -> &SharedMonitor {
        &self.monitor
    }
}

impl<T: Element> Linked for MergeList<T> {
    fn unlink(&self) {
        let _guard = self.monitor.acquire_write();
        if self.unlinked.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(subscription) = self.set_subscription.lock().take() {
            self.sources.unsubscribe(subscription);
        }
        let members = std::mem::take(&mut self.state.lock().members);
        for member in &members {
            member.source.remove_observer(&member.observer);
        }
        tracing::debug!(sources = members.len(), "merge unlinked");
    }
}

impl<T: Element> Drop for MergeList<T> {
    fn drop(&mut self) {
        self.unlink();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::mutable::{ListMutator, MutableList};
    use crate::pipeline::nodes::testing::record;
    use crate::sync::{ReadWriteMonitor, SharedMonitor};
    use proptest::prelude::*;

    fn member(monitor: &SharedMonitor, values: Vec<i32>) -> Arc<MutableList<i32>> {
        MutableList::from_vec(values, monitor.clone())
    }

    #[test]
    fn test_removing_middle_source() {
        let monitor = ReadWriteMonitor::shared();
        let set = SourceSet::new(monitor.clone());
        let lists: Vec<_> = (0..3)
            .map(|k| member(&monitor, (0..5).map(|i| k * 10 + i).collect()))
            .collect();
        for list in &lists {
            set.add(list.clone()).unwrap();
        }
        let merged = MergeList::new(&set).unwrap();
        assert_eq!(merged.len(), 15);
        let events = record(&merged);

        let middle: SharedList<i32> = lists[1].clone();
        assert!(set.remove(&middle).unwrap());
        assert_eq!(merged.len(), 10);
        assert_eq!(
            merged.to_vec(),
            vec![0, 1, 2, 3, 4, 20, 21, 22, 23, 24]
        );
        assert_eq!(
            *events.lock(),
            vec![
                ListEvent::Removing { start: 5, count: 5 },
                ListEvent::Removed { start: 5, count: 5 },
            ]
        );

        // The third source's offset followed the removal.
        lists[2].set(0, 99).unwrap();
        assert_eq!(merged.get(5).unwrap(), 99);
        // The removed source is no longer followed.
        lists[1].clear().unwrap();
        assert_eq!(merged.len(), 10);
    }

    #[test]
    fn test_member_events_are_offset() {
        let monitor = ReadWriteMonitor::shared();
        let set = SourceSet::new(monitor.clone());
        let a = member(&monitor, vec![1, 2]);
        let b = member(&monitor, vec![3, 4]);
        set.add(a.clone()).unwrap();
        set.add(b.clone()).unwrap();
        let merged = MergeList::new(&set).unwrap();
        let events = record(&merged);

        b.add_at(1, 30).unwrap();
        a.remove(0, 1).unwrap();
        b.move_range(0, 2, 1).unwrap();
        b.set(0, 31).unwrap();
        assert_eq!(merged.to_vec(), vec![2, 31, 4, 3]);
        assert_eq!(
            *events.lock(),
            vec![
                ListEvent::Added { start: 3, count: 1 },
                ListEvent::Removing { start: 0, count: 1 },
                ListEvent::Removed { start: 0, count: 1 },
                ListEvent::Moved {
                    from: 1,
                    to: 3,
                    count: 1
                },
                ListEvent::Changing { start: 1, count: 1 },
                ListEvent::Changed { start: 1, count: 1 },
            ]
        );
    }

    #[test]
    fn test_member_reset_shifts_later_members() {
        let monitor = ReadWriteMonitor::shared();
        let set = SourceSet::new(monitor.clone());
        let a = member(&monitor, vec![1, 2]);
        let b = member(&monitor, vec![3]);
        set.add(a.clone()).unwrap();
        set.add(b.clone()).unwrap();
        let merged = MergeList::new(&set).unwrap();

        a.reset(vec![7, 8, 9, 10]).unwrap();
        assert_eq!(merged.to_vec(), vec![7, 8, 9, 10, 3]);
        b.add(4).unwrap();
        assert_eq!(merged.to_vec(), vec![7, 8, 9, 10, 3, 4]);

        a.reset(vec![]).unwrap();
        assert_eq!(merged.to_vec(), vec![3, 4]);
        b.remove(0, 1).unwrap();
        assert_eq!(merged.to_vec(), vec![4]);
    }

    #[test]
    fn test_member_on_foreign_monitor_is_rejected() {
        let monitor = ReadWriteMonitor::shared();
        let set = SourceSet::new(monitor.clone());
        set.add(member(&monitor, vec![1]) as SharedList<i32>).unwrap();
        let merged = MergeList::new(&set).unwrap();
        let events = record(&merged);

        let foreign = member(&ReadWriteMonitor::shared(), vec![7, 8]);
        let err = set.add(foreign.clone() as SharedList<i32>).unwrap_err();
        assert!(matches!(err, CollectionError::InvalidArgument(_)));
        let err = merged.add_source(foreign.clone()).unwrap_err();
        assert!(matches!(err, CollectionError::InvalidArgument(_)));

        foreign.add(9).unwrap();
        assert_eq!(merged.source_count(), 1);
        assert_eq!(merged.to_vec(), vec![1]);
        assert!(events.lock().is_empty());
    }

    #[test]
    fn test_sources_added_after_creation() {
        let monitor = ReadWriteMonitor::shared();
        let set = SourceSet::new(monitor.clone());
        let merged = MergeList::new(&set).unwrap();
        let events = record(&merged);

        set.add(member(&monitor, vec![]) as SharedList<i32>).unwrap();
        set.add(member(&monitor, vec![5, 6]) as SharedList<i32>).unwrap();
        assert_eq!(merged.source_count(), 2);
        assert_eq!(merged.to_vec(), vec![5, 6]);
        assert_eq!(
            *events.lock(),
            vec![ListEvent::Added { start: 0, count: 2 }]
        );
    }

    #[test]
    fn test_unlink_stops_following() {
        let monitor = ReadWriteMonitor::shared();
        let set = SourceSet::new(monitor.clone());
        let a = member(&monitor, vec![1]);
        set.add(a.clone()).unwrap();
        let merged = MergeList::new(&set).unwrap();

        merged.unlink();
        merged.unlink();
        a.add(2).unwrap();
        set.add(member(&monitor, vec![3]) as SharedList<i32>).unwrap();
        assert_eq!(merged.to_vec(), vec![1]);
        assert_eq!(merged.source_count(), 0);
    }

    proptest! {
        #[test]
        fn test_merge_matches_concatenation(
            ops in prop::collection::vec((0usize..3, 0u8..5, any::<usize>(), any::<i32>()), 1..40),
        ) {
            let monitor = ReadWriteMonitor::shared();
            let set = SourceSet::new(monitor.clone());
            let lists: Vec<_> = (0..3).map(|_| member(&monitor, Vec::new())).collect();
            for list in &lists {
                set.add(list.clone()).unwrap();
            }
            let merged = MergeList::new(&set).unwrap();

            for (which, kind, index, value) in ops {
                let list = &lists[which];
                let len = list.len();
                match kind {
                    0 => list.add_at(index % (len + 1), value).unwrap(),
                    1 if len > 0 => list.set(index % len, value).unwrap(),
                    2 if len > 0 => list.remove(index % len, index % 3).unwrap(),
                    3 if len > 0 => list.move_range(index % len, 0, 1).unwrap(),
                    4 => list.reset(vec![value; index % 4]).unwrap(),
                    _ => {}
                }
                let expected: Vec<i32> = lists.iter().flat_map(|l| l.to_vec()).collect();
                prop_assert_eq!(merged.to_vec(), expected);
            }
        }
    }
}
