//! Computed Implementation
//!
//! A Computed is a cached derived value backed by a lazy [`Watcher`].
//!
//! # How Computed Values Work
//!
//! 1. Nothing runs at creation time; the first read evaluates and caches.
//!
//! 2. When a dependency changes, the watcher is only marked dirty. Nothing
//!    recomputes until somebody reads the value again.
//!
//! 3. A read from inside another evaluation (a render, say) makes that
//!    evaluation depend on everything the computed depends on, so the reader
//!    is notified by the same deps that dirty the computed.

use std::fmt::{self, Debug};

use super::context::ReactiveContext;
use super::watcher::{WatchValue, Watcher, WatcherOptions};
use crate::error::{EvalError, Result};

/// A cached derived value that recomputes only when read after a change.
pub struct Computed<T: WatchValue> {
    watcher: Watcher<T>,
}

impl<T: WatchValue> Computed<T> {
    /// Create a computed value from an infallible function.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self::try_new(move || Ok(compute()))
    }

    /// Create a computed value from a fallible function.
    pub fn try_new<F>(compute: F) -> Self
    where
        F: FnMut() -> Result<T, EvalError> + 'static,
    {
        Self {
            watcher: Watcher::new_lazy(compute, WatcherOptions::new()),
        }
    }

    /// Get the current value, recomputing if a dependency changed since the
    /// last read.
    pub fn get(&self) -> Result<T> {
        let value = match self.watcher.value() {
            Some(value) if !self.watcher.is_dirty() => value,
            _ => self.watcher.evaluate()?,
        };
        if ReactiveContext::is_active() {
            self.watcher.depend();
        }
        Ok(value)
    }

    /// Whether the next read will recompute.
    pub fn is_dirty(&self) -> bool {
        self.watcher.is_dirty()
    }

    /// The backing watcher.
    pub fn watcher(&self) -> &Watcher<T> {
        &self.watcher
    }
}

impl<T: WatchValue> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            watcher: self.watcher.clone(),
        }
    }
}

impl<T: WatchValue + Debug> Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.watcher.id())
            .field("value", &self.watcher.value())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Reactive;
    use crate::scheduler::Runtime;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn computes_lazily_and_caches() {
        let computations = Rc::new(Cell::new(0));
        let c = computations.clone();
        let computed = Computed::new(move || {
            c.set(c.get() + 1);
            42
        });

        assert_eq!(computations.get(), 0);
        assert_eq!(computed.get().unwrap(), 42);
        assert_eq!(computed.get().unwrap(), 42);
        assert_eq!(computed.get().unwrap(), 42);
        assert_eq!(computations.get(), 1);
    }

    #[test]
    fn recomputes_after_dependency_change() {
        let count = Reactive::new(10);
        let c = count.clone();
        let doubled = Computed::new(move || c.get() * 2);

        assert_eq!(doubled.get().unwrap(), 20);
        assert!(!doubled.is_dirty());

        count.set(5);
        assert!(doubled.is_dirty());
        assert_eq!(doubled.get().unwrap(), 10);
    }

    #[test]
    fn computed_chain() {
        let base = Reactive::new(5);
        let b = base.clone();
        let doubled = Computed::new(move || b.get() * 2);
        let d = doubled.clone();
        let plus_ten = Computed::try_new(move || Ok(d.get()? + 10));

        assert_eq!(plus_ten.get().unwrap(), 20);

        base.set(10);
        assert_eq!(plus_ten.get().unwrap(), 30);
    }

    #[test]
    fn reader_depends_on_computed_dependencies() {
        let count = Reactive::new(1);
        let c = count.clone();
        let doubled = Computed::new(move || c.get() * 2);

        let d = doubled.clone();
        let render = Watcher::new(move || Ok(d.get()?), WatcherOptions::new()).unwrap();
        assert_eq!(render.value(), Some(2));
        assert!(render.depends_on(count.dep()));

        count.set(4);
        Runtime::tick().unwrap();
        assert_eq!(render.value(), Some(8));
        assert_eq!(render.run_count(), 2);
    }

    #[test]
    fn errors_propagate_to_the_reader() {
        let computed: Computed<i32> = Computed::try_new(|| Err(EvalError::msg("nope")));
        assert!(computed.get().is_err());
        assert!(computed.is_dirty());
    }
}
