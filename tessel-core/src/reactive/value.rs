//! Observed Values
//!
//! [`observe`] turns a plain JSON-shaped value into reactive state: objects
//! become [`ReactiveObject`]s, arrays become [`ReactiveArray`]s, and
//! primitives stay primitives. Values that must never be observed (frozen
//! data, large immutable payloads) can be wrapped with [`Value::raw`].
//!
//! Observation is idempotent by construction: a [`Value`] is already
//! observed, and converting it again returns the same handles.

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use super::array::ReactiveArray;
use super::dep::Dep;
use super::object::ReactiveObject;
use super::watcher::WatchValue;
use crate::diagnostics;
use crate::error::Error;

/// A reactive, dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object(ReactiveObject),
    Array(ReactiveArray),
    /// A value that is never observed.
    Raw(Rc<serde_json::Value>),
}

/// Recursively observe a plain value.
pub fn observe(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => {
            Value::Array(ReactiveArray::from_values(items.into_iter().map(observe).collect()))
        }
        serde_json::Value::Object(map) => Value::Object(ReactiveObject::from_entries(
            map.into_iter().map(|(key, value)| (key, observe(value))),
        )),
    }
}

impl Value {
    /// Wrap a value so that it is never observed.
    pub fn raw(json: serde_json::Value) -> Self {
        Value::Raw(Rc::new(json))
    }

    /// The container dep of an observed object or array.
    pub fn dep(&self) -> Option<&Dep> {
        match self {
            Value::Object(object) => Some(object.dep()),
            Value::Array(array) => Some(array.dep()),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
            Value::Raw(_) => "raw",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ReactiveObject> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ReactiveArray> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Tracked property read on an object.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.as_object().and_then(|object| object.get(key))
    }

    /// Tracked element read on an array.
    pub fn index(&self, index: usize) -> Option<Value> {
        self.as_array().and_then(|array| array.get(index))
    }

    /// Follow a dot-separated path such as `"user.tags.0"`, tracking every
    /// step. Numeric segments index into arrays.
    pub fn get_path(&self, path: &str) -> Option<Value> {
        if path.is_empty() {
            return Some(self.clone());
        }
        let mut current = self.clone();
        for segment in path.split('.') {
            current = match &current {
                Value::Object(object) => object.get(segment)?,
                Value::Array(array) => array.get(segment.parse().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Identity for containers, equality for primitives, NaN equal to NaN.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Raw(a), Value::Raw(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// An untracked plain snapshot.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Object(object) => object.to_json(),
            Value::Array(array) => array.to_json(),
            Value::Raw(raw) => (**raw).clone(),
        }
    }

    pub(crate) fn traverse_into(&self, seen: &mut HashSet<usize>) {
        match self {
            Value::Object(object) => object.traverse(seen),
            Value::Array(array) => array.traverse(seen),
            _ => {}
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_value(other)
    }
}

impl WatchValue for Value {
    fn same_value(&self, other: &Self) -> bool {
        Value::same_value(self, other)
    }

    fn is_object(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Array(_) | Value::Raw(_))
    }

    fn traverse(&self, seen: &mut HashSet<usize>) {
        self.traverse_into(seen);
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Object(object) => fmt::Debug::fmt(object, f),
            Value::Array(array) => fmt::Debug::fmt(array, f),
            Value::Raw(raw) => write!(f, "raw({raw})"),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        observe(json)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<ReactiveObject> for Value {
    fn from(object: ReactiveObject) -> Self {
        Value::Object(object)
    }
}

impl From<ReactiveArray> for Value {
    fn from(array: ReactiveArray) -> Self {
        Value::Array(array)
    }
}

/// The key of an explicit structural mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropKey {
    Name(String),
    Index(usize),
}

impl From<&str> for PropKey {
    fn from(name: &str) -> Self {
        PropKey::Name(name.to_owned())
    }
}

impl From<String> for PropKey {
    fn from(name: String) -> Self {
        PropKey::Name(name)
    }
}

impl From<usize> for PropKey {
    fn from(index: usize) -> Self {
        PropKey::Index(index)
    }
}

/// Add or update a reactive property on an object, or an element of an
/// array.
///
/// New keys become reactive and notify the container. Primitive and raw
/// targets are reported as warnings and left untouched; the return value
/// says whether the target accepted the write.
pub fn set(target: &Value, key: impl Into<PropKey>, value: impl Into<Value>) -> bool {
    match (target, key.into()) {
        (Value::Object(object), PropKey::Name(name)) => {
            object.set(name, value);
            true
        }
        (Value::Object(object), PropKey::Index(index)) => {
            object.set(index.to_string(), value);
            true
        }
        (Value::Array(array), PropKey::Index(index)) => {
            array.set(index, value);
            true
        }
        (Value::Array(array), PropKey::Name(name)) => match name.parse::<usize>() {
            Ok(index) => {
                array.set(index, value);
                true
            }
            Err(_) => invalid_target("set", target),
        },
        _ => invalid_target("set", target),
    }
}

/// Delete a property from an object, or remove an element from an array.
pub fn delete(target: &Value, key: impl Into<PropKey>) -> bool {
    match (target, key.into()) {
        (Value::Object(object), PropKey::Name(name)) => object.delete(&name).is_some(),
        (Value::Object(object), PropKey::Index(index)) => object.delete(&index.to_string()).is_some(),
        (Value::Array(array), PropKey::Index(index)) => array.remove(index).is_some(),
        (Value::Array(array), PropKey::Name(name)) => match name.parse::<usize>() {
            Ok(index) => array.remove(index).is_some(),
            Err(_) => invalid_target("delete", target),
        },
        _ => invalid_target("delete", target),
    }
}

fn invalid_target(operation: &'static str, target: &Value) -> bool {
    diagnostics::report_warning(&Error::InvalidTarget {
        operation,
        target: target.type_name(),
    });
    false
}
