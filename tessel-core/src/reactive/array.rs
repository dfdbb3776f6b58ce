//! Reactive arrays.
//!
//! Element slots cannot be intercepted individually, so an array has a
//! single container [`Dep`]: every read depends on it and every structural
//! mutation (`push`, `pop`, `shift`, `unshift`, `splice`, `sort_by`,
//! `reverse`) notifies it. The mutators are the only way to change the
//! contents.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use super::context::ReactiveContext;
use super::dep::Dep;
use super::value::Value;

struct ArrayInner {
    dep: Dep,
    items: RefCell<Vec<Value>>,
}

/// An observed array.
#[derive(Clone)]
pub struct ReactiveArray {
    inner: Rc<ArrayInner>,
}

impl ReactiveArray {
    pub fn new() -> Self {
        Self::from_values(Vec::new())
    }

    /// Build an array from already observed values.
    pub fn from_values(items: Vec<Value>) -> Self {
        Self {
            inner: Rc::new(ArrayInner {
                dep: Dep::new(),
                items: RefCell::new(items),
            }),
        }
    }

    /// The container dep.
    pub fn dep(&self) -> &Dep {
        &self.inner.dep
    }

    /// Track the array and, recursively, the container deps of its elements.
    fn track(&self) {
        self.inner.dep.depend();
        if ReactiveContext::is_active() {
            self.depend_elements();
        }
    }

    /// Element access cannot be intercepted, so a reader of the array depends
    /// on every element's container dep as well.
    pub(crate) fn depend_elements(&self) {
        self.depend_elements_into(&mut HashSet::new());
    }

    fn depend_elements_into(&self, seen: &mut HashSet<usize>) {
        if !seen.insert(self.addr()) {
            return;
        }
        let items = self.inner.items.borrow();
        for item in items.iter() {
            if let Some(dep) = item.dep() {
                dep.depend();
            }
            if let Value::Array(nested) = item {
                nested.depend_elements_into(seen);
            }
        }
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.track();
        self.inner.items.borrow().get(index).cloned()
    }

    pub fn get_untracked(&self, index: usize) -> Option<Value> {
        self.inner.items.borrow().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.dep.depend();
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot of the elements. Tracked.
    pub fn to_vec(&self) -> Vec<Value> {
        self.track();
        self.inner.items.borrow().clone()
    }

    /// Iterate over a snapshot of the elements. Tracked.
    pub fn iter(&self) -> std::vec::IntoIter<Value> {
        self.to_vec().into_iter()
    }

    /// Run `op` on the raw vector, then notify.
    fn mutate<R>(&self, method: &'static str, op: impl FnOnce(&mut Vec<Value>) -> R) -> R {
        let result = op(&mut self.inner.items.borrow_mut());
        trace!(method, "array mutation");
        self.inner.dep.notify();
        result
    }

    /// Append an element. Returns the new length.
    pub fn push(&self, value: impl Into<Value>) -> usize {
        let value = value.into();
        self.mutate("push", |items| {
            items.push(value);
            items.len()
        })
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Option<Value> {
        self.mutate("pop", Vec::pop)
    }

    /// Remove and return the first element.
    pub fn shift(&self) -> Option<Value> {
        self.mutate("shift", |items| {
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        })
    }

    /// Prepend an element. Returns the new length.
    pub fn unshift(&self, value: impl Into<Value>) -> usize {
        let value = value.into();
        self.mutate("unshift", |items| {
            items.insert(0, value);
            items.len()
        })
    }

    /// Remove `delete_count` elements starting at `start` and insert `items`
    /// in their place. Out-of-range arguments are clamped. Returns the
    /// removed elements.
    pub fn splice<I>(&self, start: usize, delete_count: usize, items: I) -> Vec<Value>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let inserted: Vec<Value> = items.into_iter().map(Into::into).collect();
        self.mutate("splice", |current| {
            let start = start.min(current.len());
            let end = start.saturating_add(delete_count).min(current.len());
            current.splice(start..end, inserted).collect()
        })
    }

    /// Sort with a comparator. The comparator works on a copy, so it may
    /// read the array.
    pub fn sort_by<F>(&self, compare: F)
    where
        F: FnMut(&Value, &Value) -> Ordering,
    {
        let mut sorted = self.inner.items.borrow().clone();
        sorted.sort_by(compare);
        self.mutate("sort", |items| *items = sorted);
    }

    /// Reverse in place.
    pub fn reverse(&self) {
        self.mutate("reverse", |items| items.reverse());
    }

    /// Replace the element at `index`, growing the array with nulls when the
    /// index is past the end.
    pub fn set(&self, index: usize, value: impl Into<Value>) {
        let value = value.into();
        self.mutate("splice", |items| {
            if index >= items.len() {
                items.resize(index + 1, Value::Null);
            }
            items[index] = value;
        });
    }

    /// Remove the element at `index`, if any.
    pub fn remove(&self, index: usize) -> Option<Value> {
        self.splice(index, 1, std::iter::empty::<Value>()).into_iter().next()
    }

    pub fn ptr_eq(&self, other: &ReactiveArray) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.inner) as *const () as usize
    }

    pub(crate) fn traverse(&self, seen: &mut HashSet<usize>) {
        if !seen.insert(self.addr()) {
            return;
        }
        for item in self.to_vec() {
            item.traverse_into(seen);
        }
    }

    pub(crate) fn to_json(&self) -> serde_json::Value {
        let items = self.inner.items.borrow().clone();
        serde_json::Value::Array(items.iter().map(Value::to_json).collect())
    }
}

impl Default for ReactiveArray {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Into<Value>> FromIterator<V> for ReactiveArray {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self::from_values(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Debug for ReactiveArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.items.borrow().iter()).finish()
    }
}
