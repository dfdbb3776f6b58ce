//! Reactive Primitives
//!
//! This module implements dependency tracking: reactive properties publish
//! through [`Dep`]s, and [`Watcher`]s subscribe to whatever they read.
//!
//! # Concepts
//!
//! ## Reactive properties
//!
//! A property is a value plus the `Dep` that publishes changes to it.
//! [`Reactive<T>`] is the typed form. [`observe`] turns JSON-shaped data into
//! [`ReactiveObject`]s and [`ReactiveArray`]s, where every object key is its
//! own property and every container carries one more `Dep` for structural
//! changes (added or deleted keys, array mutations).
//!
//! ## Watchers
//!
//! A Watcher evaluates a function, remembers which deps it read, and re-runs
//! when one of them changes. Render functions, [`Computed`] values and user
//! callbacks registered with [`watch`] are all watchers.
//!
//! # Implementation Notes
//!
//! The evaluation target lives on a thread-local stack (see
//! [`ReactiveContext`]). A property read checks the top of the stack and, if
//! a watcher is evaluating, records the dependency in both directions.

mod array;
mod computed;
mod context;
mod dep;
mod object;
mod slot;
mod subscriber;
mod value;
mod watcher;

pub use array::ReactiveArray;
pub use computed::Computed;
pub use context::ReactiveContext;
pub use dep::{Dep, DepId};
pub use object::ReactiveObject;
pub use slot::Reactive;
pub use subscriber::{Subscriber, WatcherId};
pub use value::{delete, observe, set, PropKey, Value};
pub use watcher::{watch, WatchValue, Watcher, WatcherOptions};

use crate::error::Result;

/// Watch a dot-separated path (`"user.tags.0"`) below `root`.
///
/// The callback receives the new and old value at the path; a missing path
/// reads as [`Value::Null`].
pub fn watch_path<C>(root: &Value, path: &str, callback: C) -> Result<Watcher<Value>>
where
    C: FnMut(&Value, Option<&Value>) + 'static,
{
    let root = root.clone();
    let path = path.to_owned();
    let label = path.clone();
    Watcher::with_callback(
        move || Ok(root.get_path(&path).unwrap_or_default()),
        callback,
        WatcherOptions::new().user().label(label),
    )
}
