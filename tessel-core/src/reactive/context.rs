//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a reactive property is
//! read, it can register the current computation as a dependent.
//!
//! # Implementation
//!
//! We use a thread-local stack to track the currently executing computation.
//! When entering a reactive context (e.g., evaluating a watcher), we push the
//! subscriber onto the stack. When the computation completes, we pop it.
//!
//! This design supports nested reactive contexts (e.g., a computed value read
//! while a render watcher is evaluating). A `None` entry suspends tracking
//! for its duration.

use std::cell::RefCell;
use std::rc::Rc;

use super::subscriber::{Subscriber, WatcherId};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Option<Rc<dyn Subscriber>>>> = const { RefCell::new(Vec::new()) };
}

/// Guard that pops the context when dropped.
///
/// This keeps the stack balanced even if the computation panics, so a leaked
/// target can never be blamed for unrelated reads.
pub struct ReactiveContext {
    subscriber_id: Option<WatcherId>,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given subscriber.
    ///
    /// While this context is active, reactive reads register the subscriber
    /// as a dependent. The context is exited when the guard is dropped.
    pub fn enter(subscriber: Rc<dyn Subscriber>) -> Self {
        let subscriber_id = Some(subscriber.id());
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(Some(subscriber)));
        Self { subscriber_id }
    }

    /// Enter a scope in which reads are not tracked.
    pub fn enter_untracked() -> Self {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(None));
        Self {
            subscriber_id: None,
        }
    }

    /// Run `f` with dependency tracking suspended.
    pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
        let _ctx = Self::enter_untracked();
        f()
    }

    /// Check if a subscriber is currently collecting dependencies.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| matches!(stack.borrow().last(), Some(Some(_))))
    }

    /// Get the current subscriber, if any.
    pub fn current() -> Option<Rc<dyn Subscriber>> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().cloned().flatten())
    }

    /// Get the current subscriber id, if any.
    pub fn current_subscriber() -> Option<WatcherId> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .and_then(|entry| entry.as_ref().map(|s| s.id()))
        })
    }

    /// Depth of the context stack, including untracked scopes.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Catch mismatched enter/exit pairs early.
            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.as_ref().map(|s| s.id()),
                    self.subscriber_id,
                    "ReactiveContext mismatch"
                );
            }
        });
    }
}
