//! Runtime Configuration
//!
//! Configuration is plain data: it can be built in code or loaded from JSON.
//! Like the rest of the runtime state it is thread-local, so tests running on
//! different threads never observe each other's settings.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};

/// Tunable knobs of the reactive runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How many times one watcher may run within a single flush before it is
    /// reported as an infinite update loop and skipped.
    pub max_update_count: u32,

    /// When `true`, scheduled watchers are flushed on the next tick. When
    /// `false`, every scheduling request flushes immediately, which is
    /// mostly useful in tests.
    pub async_flush: bool,

    /// Suppress warnings (errors are still reported).
    pub silent: bool,

    /// Report duplicate sibling keys while patching.
    pub check_duplicate_keys: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_update_count: 100,
            async_flush: true,
            silent: false,
            check_duplicate_keys: true,
        }
    }
}

impl Config {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

thread_local! {
    static CONFIG: RefCell<Config> = RefCell::new(Config::default());
}

/// A copy of the configuration active on this thread.
pub fn current() -> Config {
    CONFIG.with(|config| config.borrow().clone())
}

/// Replace the configuration for this thread.
pub fn set(config: Config) {
    CONFIG.with(|current| *current.borrow_mut() = config);
}

/// Modify the configuration for this thread in place.
pub fn update<F>(f: F)
where
    F: FnOnce(&mut Config),
{
    CONFIG.with(|config| f(&mut config.borrow_mut()));
}

pub(crate) fn with<R>(f: impl FnOnce(&Config) -> R) -> R {
    CONFIG.with(|config| f(&config.borrow()))
}
