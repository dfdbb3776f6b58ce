//! Watcher Implementation
//!
//! A Watcher wraps an evaluator (a pure read of reactive state) and, optionally,
//! a callback invoked when the evaluated value changes. It is the unit that
//! render functions, computed values and user watches are built from.
//!
//! # How Watchers Work
//!
//! 1. Evaluating a watcher pushes it onto the reactive context stack, so
//!    every reactive read registers it with the read property's [`Dep`].
//!
//! 2. After each evaluation the dependency set is reconciled: deps that were
//!    read last time but not this time are unsubscribed. A dependency set is
//!    always exactly what the latest evaluation read.
//!
//! 3. When a dependency changes, the watcher is notified through
//!    [`Subscriber::update`]:
//!    - lazy watchers only mark themselves dirty,
//!    - sync watchers re-run immediately,
//!    - everything else is handed to the scheduler and re-runs once per flush.
//!
//! # Change Detection
//!
//! After a re-run the callback fires when the new value is not the same as
//! the old one, when the value is non-primitive (it may have been mutated in
//! place), or when deep tracking is on.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;
use tracing::trace;

use super::context::ReactiveContext;
use super::dep::{Dep, DepId};
use super::subscriber::{Subscriber, WatcherId};
use crate::diagnostics;
use crate::error::{Error, EvalError, Result};
use crate::scheduler;

/// Values a watcher can produce.
///
/// `same_value` decides whether a re-run changed anything, `is_object` marks
/// values that may change in place (those always count as changed), and
/// `traverse` touches every nested reactive value for deep watchers.
pub trait WatchValue: Clone + 'static {
    fn same_value(&self, other: &Self) -> bool;

    fn is_object(&self) -> bool {
        false
    }

    fn traverse(&self, _seen: &mut HashSet<usize>) {}
}

macro_rules! primitive_watch_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl WatchValue for $ty {
                fn same_value(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

primitive_watch_value!(
    (), bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, String,
    &'static str,
);

impl WatchValue for f32 {
    fn same_value(&self, other: &Self) -> bool {
        self == other || (self.is_nan() && other.is_nan())
    }
}

impl WatchValue for f64 {
    fn same_value(&self, other: &Self) -> bool {
        self == other || (self.is_nan() && other.is_nan())
    }
}

impl<T: WatchValue> WatchValue for Option<T> {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same_value(b),
            (None, None) => true,
            _ => false,
        }
    }

    fn is_object(&self) -> bool {
        self.as_ref().is_some_and(WatchValue::is_object)
    }

    fn traverse(&self, seen: &mut HashSet<usize>) {
        if let Some(value) = self {
            value.traverse(seen);
        }
    }
}

impl<T: WatchValue> WatchValue for Vec<T> {
    fn same_value(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.same_value(b))
    }

    fn is_object(&self) -> bool {
        true
    }

    fn traverse(&self, seen: &mut HashSet<usize>) {
        for value in self {
            value.traverse(seen);
        }
    }
}

impl<T: 'static> WatchValue for Rc<T> {
    fn same_value(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }

    fn is_object(&self) -> bool {
        true
    }
}

/// How a watcher evaluates and reacts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatcherOptions {
    /// Touch every nested reactive value of the result while evaluating.
    pub deep: bool,
    /// Do not evaluate eagerly; only mark dirty on change (computed values).
    pub lazy: bool,
    /// Re-run synchronously on change instead of going through the scheduler.
    pub sync: bool,
    /// A user-registered watcher: evaluator errors are reported, not returned.
    pub user: bool,
    /// Invoke the callback once right after creation.
    pub immediate: bool,
    /// Label shown in diagnostics.
    pub label: Option<String>,
}

impl WatcherOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deep(mut self) -> Self {
        self.deep = true;
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn sync(mut self) -> Self {
        self.sync = true;
        self
    }

    pub fn user(mut self) -> Self {
        self.user = true;
        self
    }

    pub fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

type Getter<T> = Box<dyn FnMut() -> Result<T, EvalError>>;
type Callback<T> = Box<dyn FnMut(&T, Option<&T>)>;

struct WatcherInner<T: WatchValue> {
    id: WatcherId,
    this: Weak<WatcherInner<T>>,
    options: WatcherOptions,
    getter: RefCell<Getter<T>>,
    callback: RefCell<Option<Callback<T>>>,
    before: RefCell<Option<Box<dyn FnMut()>>>,
    value: RefCell<Option<T>>,
    dirty: Cell<bool>,
    active: Cell<bool>,
    deps: RefCell<SmallVec<[Dep; 8]>>,
    dep_ids: RefCell<HashSet<DepId>>,
    new_deps: RefCell<SmallVec<[Dep; 8]>>,
    new_dep_ids: RefCell<HashSet<DepId>>,
    run_count: Cell<usize>,
}

/// Reconciles the dependency set when an evaluation ends, even by unwinding.
struct CleanupDeps<'a, T: WatchValue>(&'a WatcherInner<T>);

impl<T: WatchValue> Drop for CleanupDeps<'_, T> {
    fn drop(&mut self) {
        self.0.cleanup_deps();
    }
}

impl<T: WatchValue> WatcherInner<T> {
    /// Evaluate the getter and collect dependencies.
    fn get(&self) -> Result<T> {
        let this: Rc<dyn Subscriber> = match self.this.upgrade() {
            Some(this) => this,
            None => return Err(Error::Reentrant(self.id)),
        };
        let mut getter = self
            .getter
            .try_borrow_mut()
            .map_err(|_| Error::Reentrant(self.id))?;

        let _cleanup = CleanupDeps(self);
        let _ctx = ReactiveContext::enter(this);
        self.run_count.set(self.run_count.get() + 1);

        match (*getter)() {
            Ok(value) => {
                if self.options.deep {
                    value.traverse(&mut HashSet::new());
                }
                Ok(value)
            }
            Err(cause) => Err(Error::Evaluation {
                watcher: self.id,
                label: self.options.label.clone(),
                cause,
            }),
        }
    }

    /// Drop subscriptions that the last evaluation no longer needed.
    fn cleanup_deps(&self) {
        let new_ids = self.new_dep_ids.take();
        let new_deps = self.new_deps.take();

        for dep in self.deps.borrow().iter() {
            if !new_ids.contains(&dep.id()) {
                dep.remove_sub(self.id);
            }
        }

        *self.deps.borrow_mut() = new_deps;
        *self.dep_ids.borrow_mut() = new_ids;
    }

    fn invoke_callback(&self, value: &T, old: Option<&T>) -> Result<()> {
        let mut callback = self
            .callback
            .try_borrow_mut()
            .map_err(|_| Error::Reentrant(self.id))?;
        if let Some(callback) = callback.as_mut() {
            callback(value, old);
        }
        Ok(())
    }

    /// Evaluate, routing user errors to the diagnostic channel.
    fn get_contained(&self) -> Result<Option<T>> {
        match self.get() {
            Ok(value) => Ok(Some(value)),
            Err(err) if self.options.user => {
                diagnostics::report_error(&err);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn teardown(&self) {
        if !self.active.replace(false) {
            return;
        }
        for dep in self.deps.borrow().iter() {
            dep.remove_sub(self.id);
        }
        self.deps.borrow_mut().clear();
        self.dep_ids.borrow_mut().clear();
    }
}

impl<T: WatchValue> Subscriber for WatcherInner<T> {
    fn id(&self) -> WatcherId {
        self.id
    }

    fn is_active(&self) -> bool {
        self.active.get()
    }

    fn add_dep(&self, dep: &Dep) {
        let id = dep.id();
        if !self.new_dep_ids.borrow_mut().insert(id) {
            return;
        }
        self.new_deps.borrow_mut().push(dep.clone());
        if !self.dep_ids.borrow().contains(&id) {
            let weak: Weak<dyn Subscriber> = self.this.clone();
            dep.add_sub(weak, self.id);
        }
    }

    fn update(self: Rc<Self>) {
        if !self.active.get() {
            return;
        }
        if self.options.lazy {
            self.dirty.set(true);
        } else if self.options.sync {
            if let Err(err) = self.run() {
                diagnostics::report_error(&err);
            }
        } else {
            scheduler::queue_watcher(self);
        }
    }

    fn run(&self) -> Result<()> {
        if !self.active.get() {
            return Ok(());
        }
        trace!(watcher = %self.id, "run");

        let Some(value) = self.get_contained()? else {
            return Ok(());
        };

        let changed = match self.value.borrow().as_ref() {
            Some(old) => !value.same_value(old),
            None => true,
        } || value.is_object()
            || self.options.deep;

        if changed {
            let old = self.value.replace(Some(value.clone()));
            self.invoke_callback(&value, old.as_ref())?;
        }
        Ok(())
    }

    fn before_run(&self) {
        if let Ok(mut before) = self.before.try_borrow_mut() {
            if let Some(before) = before.as_mut() {
                before();
            }
        }
    }

    fn label(&self) -> Option<String> {
        self.options.label.clone()
    }
}

impl<T: WatchValue> Drop for WatcherInner<T> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// A re-evaluatable computation with tracked dependencies.
///
/// # Example
///
/// ```rust,ignore
/// let count = Reactive::new(0);
///
/// let c = count.clone();
/// let watcher = Watcher::with_callback(
///     move || Ok(c.get()),
///     |new, old| println!("{old:?} -> {new}"),
///     WatcherOptions::new().user(),
/// )?;
///
/// count.set(5);
/// Runtime::tick()?; // prints "Some(0) -> 5"
/// ```
pub struct Watcher<T: WatchValue> {
    inner: Rc<WatcherInner<T>>,
}

impl<T: WatchValue> Watcher<T> {
    /// Create a watcher without a callback (a render watcher, typically).
    ///
    /// Unless `options.lazy` is set the getter runs immediately to establish
    /// the initial dependencies.
    pub fn new<F>(getter: F, options: WatcherOptions) -> Result<Self>
    where
        F: FnMut() -> Result<T, EvalError> + 'static,
    {
        Self::build(Box::new(getter), None, options)
    }

    /// Create a watcher whose callback receives `(new, old)` after every
    /// change-producing re-run.
    pub fn with_callback<F, C>(getter: F, callback: C, options: WatcherOptions) -> Result<Self>
    where
        F: FnMut() -> Result<T, EvalError> + 'static,
        C: FnMut(&T, Option<&T>) + 'static,
    {
        Self::build(Box::new(getter), Some(Box::new(callback)), options)
    }

    /// Create a lazy watcher. It does not evaluate until asked to, so
    /// construction cannot fail.
    pub fn new_lazy<F>(getter: F, options: WatcherOptions) -> Self
    where
        F: FnMut() -> Result<T, EvalError> + 'static,
    {
        Self {
            inner: Self::allocate(Box::new(getter), None, options.lazy()),
        }
    }

    fn allocate(getter: Getter<T>, callback: Option<Callback<T>>, options: WatcherOptions) -> Rc<WatcherInner<T>> {
        let lazy = options.lazy;
        Rc::new_cyclic(|this| WatcherInner {
            id: WatcherId::new(),
            this: this.clone(),
            options,
            getter: RefCell::new(getter),
            callback: RefCell::new(callback),
            before: RefCell::new(None),
            value: RefCell::new(None),
            dirty: Cell::new(lazy),
            active: Cell::new(true),
            deps: RefCell::new(SmallVec::new()),
            dep_ids: RefCell::new(HashSet::new()),
            new_deps: RefCell::new(SmallVec::new()),
            new_dep_ids: RefCell::new(HashSet::new()),
            run_count: Cell::new(0),
        })
    }

    fn build(getter: Getter<T>, callback: Option<Callback<T>>, options: WatcherOptions) -> Result<Self> {
        let inner = Self::allocate(getter, callback, options);

        if !inner.options.lazy {
            let value = inner.get_contained()?;
            if inner.options.immediate {
                if let Some(value) = &value {
                    inner.invoke_callback(value, None)?;
                }
            }
            *inner.value.borrow_mut() = value;
        }

        Ok(Self { inner })
    }

    /// The watcher's id.
    pub fn id(&self) -> WatcherId {
        self.inner.id
    }

    /// The options this watcher was created with.
    pub fn options(&self) -> &WatcherOptions {
        &self.inner.options
    }

    /// The value produced by the latest evaluation.
    pub fn value(&self) -> Option<T> {
        self.inner.value.borrow().clone()
    }

    /// Whether a lazy watcher needs to re-evaluate before its value is read.
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Whether the watcher is still subscribed.
    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// Re-evaluate now, store the value and clear the dirty flag.
    pub fn evaluate(&self) -> Result<T> {
        let value = self.inner.get()?;
        *self.inner.value.borrow_mut() = Some(value.clone());
        self.inner.dirty.set(false);
        Ok(value)
    }

    /// Make the currently evaluating watcher depend on everything this
    /// watcher depends on.
    pub fn depend(&self) {
        let deps = self.inner.deps.borrow().clone();
        for dep in deps.iter() {
            dep.depend();
        }
    }

    /// Re-run as the scheduler would.
    pub fn run(&self) -> Result<()> {
        self.inner.run()
    }

    /// Install a hook that runs right before every scheduled run.
    pub fn set_before<F>(&self, hook: F)
    where
        F: FnMut() + 'static,
    {
        *self.inner.before.borrow_mut() = Some(Box::new(hook));
    }

    /// Unsubscribe from every dependency. The watcher never runs again.
    pub fn teardown(&self) {
        self.inner.teardown();
    }

    /// Number of deps collected by the latest evaluation.
    pub fn dependency_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }

    /// Whether the latest evaluation read `dep`.
    pub fn depends_on(&self, dep: &Dep) -> bool {
        self.inner.dep_ids.borrow().contains(&dep.id())
    }

    /// Number of evaluations so far.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }
}

impl<T: WatchValue> Clone for Watcher<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: WatchValue> fmt::Debug for Watcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.inner.id)
            .field("label", &self.inner.options.label)
            .field("dirty", &self.is_dirty())
            .field("active", &self.is_active())
            .field("dependency_count", &self.dependency_count())
            .field("run_count", &self.run_count())
            .finish()
    }
}

/// Register a user watcher: `callback(new, old)` runs after every change.
///
/// Errors from `getter` are reported through [`crate::diagnostics`] and never
/// abort a flush.
pub fn watch<T, F, C>(getter: F, callback: C) -> Result<Watcher<T>>
where
    T: WatchValue,
    F: FnMut() -> Result<T, EvalError> + 'static,
    C: FnMut(&T, Option<&T>) + 'static,
{
    Watcher::with_callback(getter, callback, WatcherOptions::new().user())
}
