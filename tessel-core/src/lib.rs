//! Tessel Core
//!
//! This crate provides the core runtime for the Tessel UI framework.
//! It implements:
//!
//! - Reactive properties and automatic dependency tracking
//! - Watchers, computed values and a batching update scheduler
//! - A keyed virtual tree diff and patch engine
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: reactive properties, deps, watchers and computed values
//! - `scheduler`: the per-tick watcher queue and the tick queue driving it
//! - `vdom`: virtual nodes, the patcher, patch modules and backends
//! - `config`, `diagnostics`, `error`: runtime settings and failure reporting
//!
//! A mutation notifies the property's dep, the dep notifies its watchers,
//! the watchers queue themselves, and the next tick runs each of them once
//! in creation order. A render watcher's run builds a new virtual tree and
//! patches it over the previous one.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use tessel_core::reactive::{observe, watch};
//! use tessel_core::scheduler::Runtime;
//!
//! let state = observe(json!({ "count": 0 }));
//!
//! let s = state.clone();
//! let _watcher = watch(
//!     move || Ok(s.get_path("count").and_then(|v| v.as_f64()).unwrap_or(0.0)),
//!     |new, old| println!("count: {old:?} -> {new}"),
//! )?;
//!
//! if let Some(object) = state.as_object() {
//!     object.set("count", 1.0);
//!     object.set("count", 2.0);
//! }
//! Runtime::tick()?; // prints once: "count: Some(0.0) -> 2"
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod reactive;
pub mod scheduler;
pub mod vdom;

pub use config::Config;
pub use error::{Error, EvalError, Result};
