//! Update Scheduler
//!
//! Watchers notified by a mutation are not re-run on the spot. They are
//! queued, and the queue is flushed once per tick, so any number of
//! synchronous mutations costs one run per affected watcher.
//!
//! # Algorithm
//!
//! 1. `queue_watcher` ignores a watcher that is already pending. Otherwise it
//!    appends it (or, during a flush, inserts it in id order after the
//!    watcher currently running) and requests a flush for the next tick.
//!
//! 2. The flush sorts the queue by watcher id. Ids are handed out in creation
//!    order, so parents run before children and a component's user watchers
//!    run before its render watcher. A child whose parent's run tears it
//!    down is skipped.
//!
//! 3. The queue is walked with a live cursor: watchers queued during the
//!    flush join the current pass. A watcher that runs more than
//!    [`Config::max_update_count`](crate::config::Config) times in one flush
//!    is reported and skipped for the rest of the flush.
//!
//! 4. All scheduler state is reset before the post-flush hooks run, so a hook
//!    that mutates state schedules a fresh flush.

mod queue;
mod tick;

pub(crate) use queue::queue_watcher;
pub use queue::Scheduler;
pub use tick::Runtime;
