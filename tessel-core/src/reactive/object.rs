//! Reactive objects: string-keyed maps whose every property owns a [`Dep`].

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::context::ReactiveContext;
use super::dep::Dep;
use super::value::Value;

struct PropertyInner {
    dep: Dep,
    value: RefCell<Value>,
}

/// One reactive property of a [`ReactiveObject`].
#[derive(Clone)]
struct Property {
    inner: Rc<PropertyInner>,
}

impl Property {
    fn new(value: Value) -> Self {
        Self {
            inner: Rc::new(PropertyInner {
                dep: Dep::new(),
                value: RefCell::new(value),
            }),
        }
    }

    /// Tracked read: the property dep, the value's own container dep, and,
    /// for arrays, every element's container dep.
    fn get(&self) -> Value {
        self.inner.dep.depend();
        let value = self.inner.value.borrow().clone();
        if ReactiveContext::is_active() {
            if let Some(child) = value.dep() {
                child.depend();
            }
            if let Value::Array(array) = &value {
                array.depend_elements();
            }
        }
        value
    }

    fn get_untracked(&self) -> Value {
        self.inner.value.borrow().clone()
    }

    fn set(&self, value: Value) -> bool {
        {
            let mut current = self.inner.value.borrow_mut();
            if current.same_value(&value) {
                return false;
            }
            *current = value;
        }
        self.inner.dep.notify();
        true
    }
}

struct ObjectInner {
    dep: Dep,
    props: RefCell<IndexMap<String, Property>>,
}

/// An observed object.
///
/// Properties present at construction, and those added later through
/// [`ReactiveObject::set`], are reactive. Adding or deleting keys notifies
/// the object's container dep, which every read through a parent property
/// (and every key enumeration) depends on.
#[derive(Clone)]
pub struct ReactiveObject {
    inner: Rc<ObjectInner>,
}

impl ReactiveObject {
    pub fn new() -> Self {
        Self::from_entries(std::iter::empty::<(String, Value)>())
    }

    /// Build an object from already observed values.
    pub fn from_entries<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let props = entries
            .into_iter()
            .map(|(key, value)| (key.into(), Property::new(value)))
            .collect();
        Self {
            inner: Rc::new(ObjectInner {
                dep: Dep::new(),
                props: RefCell::new(props),
            }),
        }
    }

    /// The container dep, notified on key insertion and deletion.
    pub fn dep(&self) -> &Dep {
        &self.inner.dep
    }

    fn property(&self, key: &str) -> Option<Property> {
        self.inner.props.borrow().get(key).cloned()
    }

    /// Read a property.
    ///
    /// A missing key depends on the container dep, so the reader re-runs
    /// once the key is added.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self.property(key) {
            Some(prop) => Some(prop.get()),
            None => {
                self.inner.dep.depend();
                None
            }
        }
    }

    /// Read a property without tracking.
    pub fn get_untracked(&self, key: &str) -> Option<Value> {
        self.property(key).map(|prop| prop.get_untracked())
    }

    /// The dep of an existing property.
    pub fn property_dep(&self, key: &str) -> Option<Dep> {
        self.property(key).map(|prop| prop.inner.dep.clone())
    }

    /// Write a property.
    ///
    /// An existing key is updated (a no-op when the value is the same). A
    /// missing key becomes a new reactive property and the container dep is
    /// notified. Returns whether anything changed.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        let key = key.into();
        let value = value.into();
        if let Some(prop) = self.property(&key) {
            return prop.set(value);
        }
        self.inner
            .props
            .borrow_mut()
            .insert(key, Property::new(value));
        self.inner.dep.notify();
        true
    }

    /// Delete a property and notify the container dep.
    pub fn delete(&self, key: &str) -> Option<Value> {
        let removed = self.inner.props.borrow_mut().shift_remove(key);
        let removed = removed.map(|prop| prop.get_untracked());
        if removed.is_some() {
            self.inner.dep.notify();
        }
        removed
    }

    /// Whether `key` exists. Tracked on the container dep.
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.dep.depend();
        self.inner.props.borrow().contains_key(key)
    }

    /// Keys in insertion order. Tracked on the container dep.
    pub fn keys(&self) -> Vec<String> {
        self.inner.dep.depend();
        self.inner.props.borrow().keys().cloned().collect()
    }

    /// Key/value pairs in insertion order; every property read is tracked.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.inner.dep.depend();
        let props: Vec<(String, Property)> = self
            .inner
            .props
            .borrow()
            .iter()
            .map(|(key, prop)| (key.clone(), prop.clone()))
            .collect();
        props
            .into_iter()
            .map(|(key, prop)| (key, prop.get()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.dep.depend();
        self.inner.props.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ptr_eq(&self, other: &ReactiveObject) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.inner) as *const () as usize
    }

    pub(crate) fn traverse(&self, seen: &mut HashSet<usize>) {
        if !seen.insert(self.addr()) {
            return;
        }
        for (_, value) in self.entries() {
            value.traverse_into(seen);
        }
    }

    pub(crate) fn to_json(&self) -> serde_json::Value {
        let props: Vec<(String, Property)> = self
            .inner
            .props
            .borrow()
            .iter()
            .map(|(key, prop)| (key.clone(), prop.clone()))
            .collect();
        serde_json::Value::Object(
            props
                .into_iter()
                .map(|(key, prop)| (key, prop.get_untracked().to_json()))
                .collect(),
        )
    }
}

impl Default for ReactiveObject {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReactiveObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let props = self.inner.props.borrow();
        f.debug_map()
            .entries(props.iter().map(|(key, prop)| (key, prop.get_untracked())))
            .finish()
    }
}
