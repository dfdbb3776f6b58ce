//! Virtual Tree Patching
//!
//! A render produces a [`VNode`] tree. The [`Patcher`] compares it with the
//! tree of the previous render and applies the difference to a real output
//! tree through the [`Backend`] trait.
//!
//! # Concepts
//!
//! ## Same node
//!
//! Two vnodes are the same node when key, tag, comment flag, presence of
//! data and (for `<input>`) the `type` attribute agree. Same nodes are
//! patched in place; anything else is replaced.
//!
//! ## Modules
//!
//! Attributes, classes and styles are not known to the diff. They are
//! handled by [`Module`]s that the patcher calls in registration order.
//!
//! ## Real nodes
//!
//! Real nodes are arena indices ([`NodeId`]). A patched vnode records the
//! index of the node it rendered to in `elm`, which is how the next patch
//! finds it.

mod backend;
mod children;
mod hydrate;
mod memory;
mod modules;
mod patch;
mod vnode;

pub use backend::{Backend, NodeId, NodeKind};
pub use memory::{MemoryTree, OpStats};
pub use modules::{default_modules, AttrsModule, ClassModule, Module, Removal, StyleModule};
pub use patch::{PatchTarget, Patcher};
pub use vnode::{same_vnode, Key, VNode, VNodeData, VNodeHooks};
