//! Reactive Slot
//!
//! `Reactive<T>` is the statically typed reactive property: a single value
//! plus the [`Dep`] that publishes changes to it.
//!
//! # How Slots Work
//!
//! 1. Reading the slot inside a watcher evaluation subscribes that watcher.
//!
//! 2. Writing a different value replaces it and notifies subscribers.
//!
//! 3. Writing an equal value is a no-op. NaN compares equal to itself here,
//!    so assigning NaN over NaN does not trigger anything.

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::Rc;

use super::dep::Dep;

struct SlotInner<T> {
    dep: Dep,
    value: RefCell<T>,
}

/// A reactive value of type `T`.
///
/// # Example
///
/// ```rust,ignore
/// let count = Reactive::new(0);
///
/// // Read the value (tracked inside watchers)
/// let value = count.get();
///
/// // Update the value (notifies subscribers)
/// count.set(5);
/// ```
pub struct Reactive<T> {
    inner: Rc<SlotInner<T>>,
}

/// `a == b`, except that two values that are not equal to themselves (NaN)
/// are considered the same.
fn unchanged<T: PartialEq>(a: &T, b: &T) -> bool {
    #[allow(clippy::eq_op)]
    let both_nan_like = a != a && b != b;
    a == b || both_nan_like
}

impl<T: 'static> Reactive<T> {
    /// Create a new slot with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(SlotInner {
                dep: Dep::new(),
                value: RefCell::new(value),
            }),
        }
    }

    /// The dep that publishes changes to this slot.
    pub fn dep(&self) -> &Dep {
        &self.inner.dep
    }

    /// Borrow the current value, tracking the read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.dep.depend();
        f(&self.inner.value.borrow())
    }

    /// Replace the value and notify subscribers, unconditionally.
    pub fn replace(&self, value: T) -> T {
        let old = self.inner.value.replace(value);
        self.inner.dep.notify();
        old
    }
}

impl<T: Clone + 'static> Reactive<T> {
    /// Get the current value.
    ///
    /// If called while a watcher evaluates, the watcher subscribes to this
    /// slot.
    pub fn get(&self) -> T {
        self.inner.dep.depend();
        self.inner.value.borrow().clone()
    }

    /// Get the current value without tracking the read.
    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }
}

impl<T: PartialEq + 'static> Reactive<T> {
    /// Set a new value and notify subscribers if it differs from the old one.
    ///
    /// Returns whether the value changed.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.inner.value.borrow_mut();
            if unchanged(&*current, &value) {
                return false;
            }
            *current = value;
        }
        self.inner.dep.notify();
        true
    }

    /// Update the value using a function of the current one.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&T) -> T,
    {
        let new_value = f(&self.inner.value.borrow());
        self.set(new_value)
    }
}

impl<T> Clone for Reactive<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Debug> Debug for Reactive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("value", &self.inner.value.borrow())
            .field("subscriber_count", &self.inner.dep.subscriber_count())
            .finish()
    }
}

impl<T: Default + 'static> Default for Reactive<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
