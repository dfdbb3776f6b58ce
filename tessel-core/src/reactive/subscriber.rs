//! Subscriber types for the reactive system.
//!
//! A Subscriber represents any computation that depends on reactive values.
//! This includes render watchers, computed values, and user watchers.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::dep::Dep;
use crate::error::Result;

/// Unique identifier for a subscriber.
///
/// Ids are handed out in creation order and are the only key the scheduler
/// sorts by: a parent's watcher is always created before its children's, and
/// a component's user watchers before its render watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatcherId(u64);

impl WatcherId {
    /// Generate a new unique, monotonically increasing id.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for WatcherId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WatcherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The type-erased face of a watcher, as seen by [`Dep`]s and the scheduler.
pub trait Subscriber {
    /// The subscriber's id.
    fn id(&self) -> WatcherId;

    /// Record that `dep` was read during the evaluation in progress.
    fn add_dep(&self, dep: &Dep);

    /// A dependency changed.
    fn update(self: Rc<Self>);

    /// Re-run the computation. Called by the scheduler during a flush.
    fn run(&self) -> Result<()>;

    /// Hook invoked by the scheduler right before [`Subscriber::run`].
    fn before_run(&self) {}

    /// `false` once torn down. Inactive subscribers are skipped by the
    /// scheduler.
    fn is_active(&self) -> bool {
        true
    }

    /// Human-readable label used in diagnostics.
    fn label(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watcher_ids_are_unique() {
        let id1 = WatcherId::new();
        let id2 = WatcherId::new();
        let id3 = WatcherId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn watcher_ids_increase() {
        let first = WatcherId::new();
        let second = WatcherId::new();
        assert!(first < second);
        assert!(first.raw() < second.raw());
    }
}
