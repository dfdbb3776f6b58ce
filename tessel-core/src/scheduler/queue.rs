//! The watcher queue and its flush.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use tracing::{debug, instrument, trace};

use super::tick::Runtime;
use crate::config;
use crate::diagnostics;
use crate::error::{Error, Result};
use crate::reactive::{Subscriber, WatcherId};

type FlushedHook = Rc<dyn Fn(&[WatcherId])>;

#[derive(Default)]
struct QueueState {
    /// Pending watchers. The queue does not keep them alive: a watcher whose
    /// last handle is dropped before its turn is skipped.
    queue: Vec<(WatcherId, Weak<dyn Subscriber>)>,
    has: HashSet<WatcherId>,
    run_counts: HashMap<WatcherId, u32>,
    aborted: HashSet<WatcherId>,
    /// A flush has been requested and has not completed yet.
    waiting: bool,
    flushing: bool,
    /// Position of the watcher currently running.
    index: usize,
    flushed_hooks: Vec<FlushedHook>,
}

impl QueueState {
    fn reset(&mut self) {
        self.queue.clear();
        self.has.clear();
        self.run_counts.clear();
        self.aborted.clear();
        self.waiting = false;
        self.flushing = false;
        self.index = 0;
    }
}

thread_local! {
    static STATE: RefCell<QueueState> = RefCell::new(QueueState::default());
}

/// Queue a watcher for the next flush.
///
/// A watcher already pending is not queued twice. During a flush the watcher
/// is inserted in id order after the one currently running, so it still runs
/// in this flush.
pub(crate) fn queue_watcher(watcher: Rc<dyn Subscriber>) {
    let id = watcher.id();
    let request_flush = STATE.with(|state| {
        let mut state = state.borrow_mut();
        if state.has.contains(&id) || state.aborted.contains(&id) {
            return false;
        }
        state.has.insert(id);

        if state.flushing {
            let mut at = state.queue.len();
            while at > state.index + 1 && state.queue[at - 1].0 > id {
                at -= 1;
            }
            state.queue.insert(at, (id, Rc::downgrade(&watcher)));
        } else {
            state.queue.push((id, Rc::downgrade(&watcher)));
        }
        trace!(watcher = %id, "queued");

        !std::mem::replace(&mut state.waiting, true)
    });

    if !request_flush {
        return;
    }
    if config::with(|c| c.async_flush) {
        Runtime::schedule(flush_queue);
    } else if let Err(err) = flush_queue() {
        diagnostics::report_error(&err);
    }
}

/// Run every pending watcher once, in id order.
///
/// Errors from non-user watchers do not stop the flush; the first one is
/// returned once the flush has completed and the rest are reported.
#[instrument(level = "debug", name = "flush")]
fn flush_queue() -> Result<()> {
    let limit = STATE.with(|state| {
        let mut state = state.borrow_mut();
        if state.flushing {
            return None;
        }
        state.flushing = true;
        state.index = 0;
        state.queue.sort_by_key(|(id, _)| *id);
        Some(config::with(|c| c.max_update_count))
    });
    let Some(limit) = limit else {
        return Ok(());
    };

    let mut ran = Vec::new();
    let mut first_error = None;

    loop {
        let next = STATE.with(|state| {
            let mut state = state.borrow_mut();
            let (id, entry) = state.queue.get(state.index).cloned()?;
            state.has.remove(&id);
            let Some(watcher) = entry.upgrade().filter(|w| w.is_active()) else {
                return Some((id, None));
            };
            let count = state.run_counts.entry(id).or_insert(0);
            *count += 1;
            let over_limit = *count > limit;
            if over_limit {
                state.aborted.insert(id);
            }
            Some((id, Some((watcher, over_limit))))
        });
        let Some((id, next)) = next else {
            break;
        };
        let Some((watcher, over_limit)) = next else {
            trace!(watcher = %id, "skipping torn down watcher");
            STATE.with(|state| state.borrow_mut().index += 1);
            continue;
        };

        if over_limit {
            diagnostics::report_error(&Error::InfiniteUpdateLoop {
                watcher: watcher.id(),
                label: watcher.label(),
                limit,
            });
        } else {
            watcher.before_run();
            ran.push(watcher.id());
            if let Err(err) = watcher.run() {
                if first_error.is_none() {
                    first_error = Some(err);
                } else {
                    diagnostics::report_error(&err);
                }
            }
        }

        STATE.with(|state| state.borrow_mut().index += 1);
    }

    let hooks = STATE.with(|state| {
        let mut state = state.borrow_mut();
        state.reset();
        state.flushed_hooks.clone()
    });
    debug!(runs = ran.len(), "flush complete");

    for hook in hooks {
        hook(&ran);
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Introspection and hooks for the thread's watcher queue.
pub struct Scheduler;

impl Scheduler {
    /// Register a hook called after every flush with the ids of the
    /// watchers that ran, in run order. Scheduler state is already reset
    /// when hooks run.
    pub fn on_flushed<F>(hook: F)
    where
        F: Fn(&[WatcherId]) + 'static,
    {
        STATE.with(|state| state.borrow_mut().flushed_hooks.push(Rc::new(hook)));
    }

    /// Remove every post-flush hook.
    pub fn clear_flushed_hooks() {
        STATE.with(|state| state.borrow_mut().flushed_hooks.clear());
    }

    /// Whether a flush is in progress.
    pub fn is_flushing() -> bool {
        STATE.with(|state| state.borrow().flushing)
    }

    /// Number of watchers waiting to run.
    pub fn pending_count() -> usize {
        STATE.with(|state| state.borrow().has.len())
    }

    /// Flush now instead of waiting for the tick. Does nothing when a flush
    /// is already in progress.
    pub fn flush() -> Result<()> {
        flush_queue()
    }
}
