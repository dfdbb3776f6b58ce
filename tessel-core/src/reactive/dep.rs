//! Dependency publish points.
//!
//! A [`Dep`] is owned by every reactive slot and by every observed container.
//! Watchers subscribe to it while they evaluate; a write notifies them.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::trace;

use super::context::ReactiveContext;
use super::subscriber::{Subscriber, WatcherId};

/// Unique identifier of a [`Dep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DepId(u64);

impl DepId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

struct DepInner {
    id: DepId,
    subs: RefCell<IndexMap<WatcherId, Weak<dyn Subscriber>>>,
}

/// An identity-bearing publish point with an ordered set of subscribers.
///
/// Cloning a `Dep` yields another handle to the same publish point.
#[derive(Clone)]
pub struct Dep {
    inner: Rc<DepInner>,
}

impl Dep {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(DepInner {
                id: DepId::next(),
                subs: RefCell::new(IndexMap::new()),
            }),
        }
    }

    pub fn id(&self) -> DepId {
        self.inner.id
    }

    /// Subscribe the currently evaluating watcher, if there is one.
    pub fn depend(&self) {
        if let Some(target) = ReactiveContext::current() {
            target.add_dep(self);
        }
    }

    /// Add a subscriber. Subscribing twice is a no-op.
    pub fn add_sub(&self, sub: Weak<dyn Subscriber>, id: WatcherId) {
        self.inner.subs.borrow_mut().entry(id).or_insert(sub);
    }

    /// Remove a subscriber, keeping the order of the remaining ones.
    pub fn remove_sub(&self, id: WatcherId) {
        self.inner.subs.borrow_mut().shift_remove(&id);
    }

    /// Inform every subscriber that the value behind this dep changed.
    ///
    /// Subscribers are snapshotted first, so watchers that subscribe or
    /// unsubscribe as a side effect of being notified cannot disturb the
    /// iteration.
    pub fn notify(&self) {
        let snapshot: SmallVec<[Weak<dyn Subscriber>; 8]> =
            self.inner.subs.borrow().values().cloned().collect();
        trace!(dep = ?self.inner.id, subscribers = snapshot.len(), "notify");

        let mut dead = false;
        for sub in snapshot {
            match sub.upgrade() {
                Some(sub) => sub.update(),
                None => dead = true,
            }
        }

        if dead {
            self.inner
                .subs
                .borrow_mut()
                .retain(|_, sub| sub.strong_count() > 0);
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subs
            .borrow()
            .values()
            .filter(|sub| sub.strong_count() > 0)
            .count()
    }

    /// Whether the watcher with `id` is subscribed.
    pub fn has_subscriber(&self, id: WatcherId) -> bool {
        self.inner.subs.borrow().contains_key(&id)
    }

    /// Ids of the subscribers, in subscription order.
    pub fn subscriber_ids(&self) -> Vec<WatcherId> {
        self.inner.subs.borrow().keys().copied().collect()
    }

    pub(crate) fn ptr_eq(&self, other: &Dep) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.inner.id)
            .field("subscribers", &self.subscriber_ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use std::cell::Cell;

    struct Counter {
        id: WatcherId,
        updates: Cell<usize>,
        this: Weak<Counter>,
    }

    impl Counter {
        fn new() -> Rc<Self> {
            Rc::new_cyclic(|this| Counter {
                id: WatcherId::new(),
                updates: Cell::new(0),
                this: this.clone(),
            })
        }
    }

    impl Subscriber for Counter {
        fn id(&self) -> WatcherId {
            self.id
        }
        fn add_dep(&self, dep: &Dep) {
            let weak: Weak<dyn Subscriber> = self.this.clone();
            dep.add_sub(weak, self.id);
        }
        fn update(self: Rc<Self>) {
            self.updates.set(self.updates.get() + 1);
        }
        fn run(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn depend_without_target_is_noop() {
        let dep = Dep::new();
        dep.depend();
        assert_eq!(dep.subscriber_count(), 0);
    }

    #[test]
    fn depend_subscribes_current_target_once() {
        let dep = Dep::new();
        let counter = Counter::new();
        {
            let _ctx = ReactiveContext::enter(counter.clone());
            dep.depend();
            dep.depend();
        }
        assert_eq!(dep.subscriber_count(), 1);
        assert!(dep.has_subscriber(counter.id));

        dep.notify();
        assert_eq!(counter.updates.get(), 1);
    }

    #[test]
    fn remove_sub_keeps_order() {
        let dep = Dep::new();
        let subs: Vec<_> = (0..3).map(|_| Counter::new()).collect();
        for sub in &subs {
            let weak: Weak<dyn Subscriber> = Rc::downgrade(sub) as Weak<dyn Subscriber>;
            dep.add_sub(weak, sub.id);
        }
        dep.remove_sub(subs[1].id);
        assert_eq!(dep.subscriber_ids(), vec![subs[0].id, subs[2].id]);
    }

    #[test]
    fn dropped_subscribers_are_pruned_on_notify() {
        let dep = Dep::new();
        let counter = Counter::new();
        let weak: Weak<dyn Subscriber> = Rc::downgrade(&counter) as Weak<dyn Subscriber>;
        dep.add_sub(weak, counter.id);
        drop(counter);

        assert_eq!(dep.subscriber_count(), 0);
        dep.notify();
        assert!(dep.subscriber_ids().is_empty());
    }
}
