//! Patch modules.
//!
//! A module owns one platform concern (attributes, classes, styles) and is
//! called by the [`Patcher`](super::Patcher) at fixed points: when a node is
//! created, patched in place, destroyed, and removed. Modules run in the
//! order they were registered.

use std::rc::Rc;

use indexmap::IndexMap;

use super::backend::{Backend, NodeId};
use super::vnode::VNode;

/// Keeps a removed node attached until every holder has let go.
///
/// Each module's `remove` hook receives one token. The node is detached by
/// [`Patcher::reap_removals`](super::Patcher::reap_removals) once all tokens
/// are dropped, so a module can delay the removal (for a leave transition)
/// by holding on to its token.
#[derive(Debug, Clone)]
pub struct Removal {
    node: Rc<NodeId>,
}

impl Removal {
    pub(crate) fn new(node: NodeId) -> Self {
        Self {
            node: Rc::new(node),
        }
    }

    pub(crate) fn watch(&self) -> std::rc::Weak<NodeId> {
        Rc::downgrade(&self.node)
    }

    /// The real node being removed.
    pub fn node(&self) -> NodeId {
        *self.node
    }

    /// Release this holder's claim. Same as dropping the token.
    pub fn done(self) {}
}

/// A pluggable patch concern.
pub trait Module<B: Backend> {
    fn name(&self) -> &'static str;

    /// A node was created. `empty` is a data-less vnode standing in for the
    /// previous state, so most modules just forward to `update`.
    fn create(&mut self, backend: &mut B, empty: &VNode, vnode: &VNode) {
        self.update(backend, empty, vnode);
    }

    fn update(&mut self, _backend: &mut B, _old: &VNode, _vnode: &VNode) {}

    fn destroy(&mut self, _backend: &mut B, _vnode: &VNode) {}

    /// The node is about to be detached.
    fn remove(&mut self, _backend: &mut B, _vnode: &VNode, removal: Removal) {
        removal.done();
    }
}

fn diff_maps<B, S, R>(
    backend: &mut B,
    elm: NodeId,
    old: Option<&IndexMap<String, String>>,
    new: Option<&IndexMap<String, String>>,
    mut set: S,
    mut remove: R,
) where
    S: FnMut(&mut B, NodeId, &str, &str),
    R: FnMut(&mut B, NodeId, &str),
{
    let empty = IndexMap::new();
    let old = old.unwrap_or(&empty);
    let new = new.unwrap_or(&empty);
    for (name, value) in new {
        if old.get(name) != Some(value) {
            set(backend, elm, name, value);
        }
    }
    for name in old.keys() {
        if !new.contains_key(name) {
            remove(backend, elm, name);
        }
    }
}

/// Plain attributes.
#[derive(Debug, Default)]
pub struct AttrsModule;

impl<B: Backend> Module<B> for AttrsModule {
    fn name(&self) -> &'static str {
        "attrs"
    }

    fn update(&mut self, backend: &mut B, old: &VNode, vnode: &VNode) {
        let Some(elm) = vnode.elm else { return };
        let old_attrs = old.data.as_ref().map(|data| &data.attrs);
        let new_attrs = vnode.data.as_ref().map(|data| &data.attrs);
        diff_maps(
            backend,
            elm,
            old_attrs,
            new_attrs,
            |b, elm, name, value| b.set_attribute(elm, name, value),
            |b, elm, name| b.remove_attribute(elm, name),
        );
    }
}

/// The `class` attribute, from the vnode's class list.
#[derive(Debug, Default)]
pub struct ClassModule;

fn class_string(vnode: &VNode) -> String {
    vnode
        .data
        .as_ref()
        .map(|data| data.classes.join(" "))
        .unwrap_or_default()
}

impl<B: Backend> Module<B> for ClassModule {
    fn name(&self) -> &'static str {
        "class"
    }

    fn update(&mut self, backend: &mut B, old: &VNode, vnode: &VNode) {
        let Some(elm) = vnode.elm else { return };
        let (old_class, new_class) = (class_string(old), class_string(vnode));
        if old_class == new_class {
            return;
        }
        if new_class.is_empty() {
            backend.remove_attribute(elm, "class");
        } else {
            backend.set_attribute(elm, "class", &new_class);
        }
    }
}

/// Inline styles.
#[derive(Debug, Default)]
pub struct StyleModule;

impl<B: Backend> Module<B> for StyleModule {
    fn name(&self) -> &'static str {
        "style"
    }

    fn update(&mut self, backend: &mut B, old: &VNode, vnode: &VNode) {
        let Some(elm) = vnode.elm else { return };
        diff_maps(
            backend,
            elm,
            old.data.as_ref().map(|data| &data.style),
            vnode.data.as_ref().map(|data| &data.style),
            |b, elm, property, value| b.set_style(elm, property, value),
            |b, elm, property| b.remove_style(elm, property),
        );
    }
}

/// Attributes, classes and styles, in that order.
pub fn default_modules<B: Backend>() -> Vec<Box<dyn Module<B>>> {
    vec![
        Box::new(AttrsModule),
        Box::new(ClassModule),
        Box::new(StyleModule),
    ]
}
