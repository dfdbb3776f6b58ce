//! Error Types
//!
//! Every failure the runtime can observe is represented by [`Error`]. Most of
//! them never reach the caller: they are handed to the diagnostic channel
//! (see [`crate::diagnostics`]) so the system stays renderable. Only
//! evaluator failures of non-user watchers propagate as `Err`.

use std::fmt;

use thiserror::Error;

use crate::reactive::WatcherId;
use crate::vdom::Key;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced by the reactive runtime and the patch engine.
#[derive(Debug, Error)]
pub enum Error {
    /// A watcher's evaluator returned an error.
    #[error("error in evaluator of watcher {watcher}{}: {cause}", label_suffix(.label))]
    Evaluation {
        watcher: WatcherId,
        label: Option<String>,
        cause: EvalError,
    },

    /// A watcher kept re-scheduling itself within one flush.
    #[error(
        "possible infinite update loop in watcher {watcher}{}: exceeded {limit} runs in one flush",
        label_suffix(.label)
    )]
    InfiniteUpdateLoop {
        watcher: WatcherId,
        label: Option<String>,
        limit: u32,
    },

    /// A watcher was re-entered while its evaluator or callback was running.
    #[error("watcher {0} was re-entered while it was already running")]
    Reentrant(WatcherId),

    /// Two siblings share a key.
    #[error("duplicate key `{key}` among siblings; this may cause an update error")]
    DuplicateKey { key: Key },

    /// The existing output tree does not match the virtual tree being hydrated.
    #[error("hydration mismatch: expected {expected}, found {found}")]
    HydrationMismatch { expected: String, found: String },

    /// A structural mutation was attempted on something that is not a container.
    #[error("cannot {operation} reactive property on a {target} value")]
    InvalidTarget {
        operation: &'static str,
        target: &'static str,
    },
}

fn label_suffix(label: &Option<String>) -> String {
    match label {
        Some(label) => format!(" (\"{}\")", label),
        None => String::new(),
    }
}

/// An error returned by a watcher evaluator.
///
/// Any [`std::error::Error`] converts into an `EvalError`, so evaluators can
/// use `?` on most error types. Ad-hoc failures use [`EvalError::msg`].
pub struct EvalError {
    inner: Box<dyn std::error::Error + 'static>,
}

impl EvalError {
    /// Create an error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            inner: message.into().into(),
        }
    }

    /// Borrow the underlying error.
    pub fn get_ref(&self) -> &(dyn std::error::Error + 'static) {
        &*self.inner
    }
}

impl<E> From<E> for EvalError
where
    E: std::error::Error + 'static,
{
    fn from(error: E) -> Self {
        Self {
            inner: Box::new(error),
        }
    }
}

impl fmt::Debug for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}
