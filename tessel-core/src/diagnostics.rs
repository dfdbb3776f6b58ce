//! Diagnostic Channel
//!
//! Failures that must not abort the current flush or patch are reported here
//! instead of being returned. By default they are logged through `tracing`;
//! applications (and tests) can install their own handlers.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{error, warn};

use crate::config;
use crate::error::Error;

type Handler = Rc<dyn Fn(&Error)>;

thread_local! {
    static ERROR_HANDLER: RefCell<Option<Handler>> = const { RefCell::new(None) };
    static WARN_HANDLER: RefCell<Option<Handler>> = const { RefCell::new(None) };
}

/// Install a handler for reported errors on this thread.
pub fn set_error_handler<F>(handler: F)
where
    F: Fn(&Error) + 'static,
{
    ERROR_HANDLER.with(|slot| *slot.borrow_mut() = Some(Rc::new(handler)));
}

/// Install a handler for warnings on this thread.
pub fn set_warn_handler<F>(handler: F)
where
    F: Fn(&Error) + 'static,
{
    WARN_HANDLER.with(|slot| *slot.borrow_mut() = Some(Rc::new(handler)));
}

/// Remove both handlers, restoring the `tracing` defaults.
pub fn clear_handlers() {
    ERROR_HANDLER.with(|slot| slot.borrow_mut().take());
    WARN_HANDLER.with(|slot| slot.borrow_mut().take());
}

/// Report an error that was contained by the runtime.
pub fn report_error(err: &Error) {
    // Clone the handler out so it may install another one while running.
    let handler = ERROR_HANDLER.with(|slot| slot.borrow().clone());
    match handler {
        Some(handler) => handler(err),
        None => error!(%err, "tessel error"),
    }
}

/// Report a warning. Suppressed when [`config::Config::silent`] is set.
pub fn report_warning(err: &Error) {
    if config::with(|c| c.silent) {
        return;
    }
    let handler = WARN_HANDLER.with(|slot| slot.borrow().clone());
    match handler {
        Some(handler) => handler(err),
        None => warn!(%err, "tessel warning"),
    }
}
