//! The tick queue.
//!
//! There is no event loop in here. Deferred work is collected until the host
//! calls [`Runtime::tick`], which plays the part of a microtask checkpoint.
//! Hosts that own an event loop register [`Runtime::on_tick_requested`] to
//! learn when a tick is needed.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::trace;

use crate::diagnostics;
use crate::error::Result;

type Task = Box<dyn FnOnce() -> Result<()>>;

#[derive(Default)]
struct TickQueue {
    tasks: VecDeque<Task>,
    /// A tick has been requested and not yet run.
    pending: bool,
    on_requested: Option<Rc<dyn Fn()>>,
}

thread_local! {
    static TICK: RefCell<TickQueue> = RefCell::new(TickQueue::default());
}

/// Entry point for driving deferred work on this thread.
pub struct Runtime;

impl Runtime {
    /// Defer `callback` to the next tick.
    ///
    /// Callbacks run in the order they were deferred. Watcher flushes go
    /// through the same queue, so a callback deferred after a mutation sees
    /// the flushed state.
    pub fn next_tick<F>(callback: F)
    where
        F: FnOnce() + 'static,
    {
        Self::schedule(move || {
            callback();
            Ok(())
        });
    }

    pub(crate) fn schedule<F>(task: F)
    where
        F: FnOnce() -> Result<()> + 'static,
    {
        let requested = TICK.with(|tick| {
            let mut tick = tick.borrow_mut();
            tick.tasks.push_back(Box::new(task));
            if std::mem::replace(&mut tick.pending, true) {
                None
            } else {
                tick.on_requested.clone()
            }
        });
        if let Some(hook) = requested {
            trace!("tick requested");
            hook();
        }
    }

    /// Run deferred work until none is left.
    ///
    /// Work deferred while ticking runs in the same call. The first error is
    /// returned after everything has run; later ones are reported through
    /// the diagnostic channel.
    pub fn tick() -> Result<()> {
        let mut first_error = None;
        loop {
            let batch: Vec<Task> = TICK.with(|tick| {
                let mut tick = tick.borrow_mut();
                tick.pending = false;
                tick.tasks.drain(..).collect()
            });
            if batch.is_empty() {
                break;
            }
            trace!(tasks = batch.len(), "tick");
            for task in batch {
                if let Err(err) = task() {
                    if first_error.is_none() {
                        first_error = Some(err);
                    } else {
                        diagnostics::report_error(&err);
                    }
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Whether deferred work is waiting for a tick.
    pub fn has_pending() -> bool {
        TICK.with(|tick| !tick.borrow().tasks.is_empty())
    }

    /// Register a hook called whenever the queue goes from idle to pending.
    pub fn on_tick_requested<F>(hook: F)
    where
        F: Fn() + 'static,
    {
        TICK.with(|tick| tick.borrow_mut().on_requested = Some(Rc::new(hook)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn callbacks_run_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let log = log.clone();
            Runtime::next_tick(move || log.borrow_mut().push(i));
        }
        assert!(Runtime::has_pending());
        assert!(log.borrow().is_empty());

        Runtime::tick().unwrap();
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert!(!Runtime::has_pending());
    }

    #[test]
    fn nested_callbacks_run_in_the_same_tick() {
        let ran = Rc::new(Cell::new(false));
        let r = ran.clone();
        Runtime::next_tick(move || Runtime::next_tick(move || r.set(true)));
        Runtime::tick().unwrap();
        assert!(ran.get());
    }

    #[test]
    fn request_hook_fires_once_per_tick() {
        let requests = Rc::new(Cell::new(0));
        let r = requests.clone();
        Runtime::on_tick_requested(move || r.set(r.get() + 1));

        Runtime::next_tick(|| {});
        Runtime::next_tick(|| {});
        assert_eq!(requests.get(), 1);

        Runtime::tick().unwrap();
        Runtime::next_tick(|| {});
        assert_eq!(requests.get(), 2);
    }
}
