//! The patcher: turns a (previous tree, next tree) pair into output-tree
//! operations.

use std::collections::HashSet;
use std::rc::{Rc, Weak};

use tracing::{debug, instrument, trace};

use super::backend::{Backend, NodeId};
use super::modules::{default_modules, Module, Removal};
use super::vnode::{same_vnode, Key, VNode, VNodeHooks};
use crate::config;
use crate::diagnostics;
use crate::error::Error;

/// What a patch starts from.
#[derive(Debug, Clone, Copy)]
pub enum PatchTarget<'a> {
    /// Nothing: build the new tree from scratch.
    None,
    /// A real node that was not produced by a previous patch (a mount point,
    /// or server-rendered markup when hydrating).
    Element(NodeId),
    /// The tree produced by the previous patch.
    VNode(&'a VNode),
}

/// Insert hooks wait here until the whole patch is done.
pub(super) type InsertQueue = Vec<(Rc<dyn VNodeHooks>, NodeId)>;

/// Applies virtual trees to a [`Backend`].
///
/// # Example
///
/// ```rust,ignore
/// let mut patcher = Patcher::new(MemoryTree::new());
///
/// let mut first = VNode::element("ul").children((1..=3).map(|i| VNode::element("li").key(i)));
/// let root = patcher.patch(PatchTarget::None, &mut first, false);
///
/// let mut next = VNode::element("ul").children([3, 1, 2].map(|i| VNode::element("li").key(i)));
/// patcher.patch(PatchTarget::VNode(&first), &mut next, false);
/// ```
pub struct Patcher<B: Backend> {
    pub(super) backend: B,
    pub(super) modules: Vec<Box<dyn Module<B>>>,
    pending_removals: Vec<(Weak<NodeId>, NodeId)>,
}

impl<B: Backend> Patcher<B> {
    /// A patcher with the default attribute, class and style modules.
    pub fn new(backend: B) -> Self {
        Self::with_modules(backend, default_modules())
    }

    pub fn with_modules(backend: B, modules: Vec<Box<dyn Module<B>>>) -> Self {
        Self {
            backend,
            modules,
            pending_removals: Vec::new(),
        }
    }

    /// Append a module. Modules run in registration order.
    pub fn register(&mut self, module: Box<dyn Module<B>>) {
        self.modules.push(module);
    }

    pub fn module_names(&self) -> Vec<&'static str> {
        self.modules.iter().map(|module| module.name()).collect()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Patch `vnode` over `old` and return the real root node.
    ///
    /// `vnode` and its descendants get their `elm` filled in, so it can be
    /// passed back as the old tree of the next patch.
    #[instrument(level = "debug", skip_all, fields(hydrating))]
    pub fn patch(&mut self, old: PatchTarget<'_>, vnode: &mut VNode, hydrating: bool) -> NodeId {
        let mut queue = InsertQueue::new();

        let root = match old {
            PatchTarget::VNode(old) if old.elm.is_some() && same_vnode(old, vnode) => {
                self.patch_vnode(old, vnode, &mut queue)
            }
            PatchTarget::VNode(old) => match old.elm {
                Some(elm) => self.replace(old, elm, vnode, &mut queue),
                None => self.create_elm(vnode, &mut queue, None, None),
            },
            PatchTarget::Element(elm) if hydrating && self.try_hydrate(elm, vnode, &mut queue) => elm,
            PatchTarget::Element(elm) => {
                let old = self.empty_node_at(elm);
                self.replace(&old, elm, vnode, &mut queue)
            }
            PatchTarget::None => self.create_elm(vnode, &mut queue, None, None),
        };

        self.invoke_insert_hooks(queue);
        self.reap_removals();
        debug!(%root, "patch complete");
        root
    }

    /// Run the destroy hooks of a tree that is going away without a
    /// replacement. The real nodes are left where they are.
    pub fn destroy(&mut self, old: &VNode) {
        self.invoke_destroy_hook(old);
    }

    /// Detach removed nodes whose removal tokens have all been released.
    /// Returns how many were detached.
    pub fn reap_removals(&mut self) -> usize {
        let (done, pending): (Vec<_>, Vec<_>) = self
            .pending_removals
            .drain(..)
            .partition(|(token, _)| token.strong_count() == 0);
        self.pending_removals = pending;

        for (_, elm) in &done {
            if let Some(parent) = self.backend.parent_node(*elm) {
                self.backend.remove_child(parent, *elm);
            }
        }
        done.len()
    }

    /// Removals still held back by a module.
    pub fn pending_removal_count(&self) -> usize {
        self.pending_removals
            .iter()
            .filter(|(token, _)| token.strong_count() > 0)
            .count()
    }

    /// Create `vnode` where `old` is, then remove `old`.
    fn replace(&mut self, old: &VNode, old_elm: NodeId, vnode: &mut VNode, queue: &mut InsertQueue) -> NodeId {
        let parent = self.backend.parent_node(old_elm);
        let next = self.backend.next_sibling(old_elm);
        let elm = self.create_elm(vnode, queue, parent, next);

        if parent.is_some() {
            self.remove_vnodes(std::slice::from_ref(old));
        } else if old.is_element() {
            self.invoke_destroy_hook(old);
        }
        elm
    }

    /// A data-less vnode standing for an existing real node.
    pub(super) fn empty_node_at(&self, elm: NodeId) -> VNode {
        VNode {
            tag: self.backend.tag_name(elm).map(str::to_owned),
            elm: Some(elm),
            ..VNode::default()
        }
    }

    /// Build the real subtree for `vnode` and insert it into `parent` before
    /// `reference`.
    pub(super) fn create_elm(
        &mut self,
        vnode: &mut VNode,
        queue: &mut InsertQueue,
        parent: Option<NodeId>,
        reference: Option<NodeId>,
    ) -> NodeId {
        let elm = match vnode.tag.as_deref() {
            Some(tag) => {
                trace!(tag, "create element");
                let elm = self.backend.create_element(tag);
                vnode.elm = Some(elm);
                self.invoke_create_hooks(vnode);
                if !vnode.children.is_empty() {
                    self.check_duplicate_keys(&vnode.children);
                    for child in vnode.children.iter_mut() {
                        self.create_elm(child, queue, Some(elm), None);
                    }
                } else if let Some(text) = vnode.text.as_deref() {
                    let text = self.backend.create_text(text);
                    self.backend.append_child(elm, text);
                }
                if let Some(hooks) = vnode.node_hooks() {
                    queue.push((hooks, elm));
                }
                elm
            }
            None if vnode.is_comment => {
                let elm = self
                    .backend
                    .create_comment(vnode.text.as_deref().unwrap_or_default());
                vnode.elm = Some(elm);
                elm
            }
            None => {
                let elm = self
                    .backend
                    .create_text(vnode.text.as_deref().unwrap_or_default());
                vnode.elm = Some(elm);
                elm
            }
        };

        if let Some(parent) = parent {
            self.insert(parent, elm, reference);
        }
        elm
    }

    fn insert(&mut self, parent: NodeId, elm: NodeId, reference: Option<NodeId>) {
        match reference {
            Some(reference) if self.backend.parent_node(reference) == Some(parent) => {
                self.backend.insert_before(parent, elm, Some(reference));
            }
            _ => self.backend.append_child(parent, elm),
        }
    }

    pub(super) fn invoke_create_hooks(&mut self, vnode: &VNode) {
        if vnode.data.is_none() {
            return;
        }
        let empty = VNode::default();
        for module in self.modules.iter_mut() {
            module.create(&mut self.backend, &empty, vnode);
        }
        if let Some(hooks) = vnode.node_hooks() {
            hooks.create(vnode);
        }
    }

    fn invoke_insert_hooks(&self, queue: InsertQueue) {
        for (hooks, elm) in queue {
            hooks.insert(elm);
        }
    }

    /// Destroy hooks, depth-first: the node's own hook, then modules, then
    /// children.
    fn invoke_destroy_hook(&mut self, vnode: &VNode) {
        if vnode.data.is_some() {
            if let Some(hooks) = vnode.node_hooks() {
                hooks.destroy(vnode);
            }
            for module in self.modules.iter_mut() {
                module.destroy(&mut self.backend, vnode);
            }
        }
        for child in &vnode.children {
            self.invoke_destroy_hook(child);
        }
    }

    pub(super) fn add_vnodes(
        &mut self,
        parent: NodeId,
        reference: Option<NodeId>,
        vnodes: &mut [VNode],
        queue: &mut InsertQueue,
    ) {
        for vnode in vnodes {
            self.create_elm(vnode, queue, Some(parent), reference);
        }
    }

    pub(super) fn remove_vnodes<'v>(&mut self, vnodes: impl IntoIterator<Item = &'v VNode>) {
        for vnode in vnodes {
            let Some(elm) = vnode.elm else { continue };
            if vnode.is_element() {
                self.invoke_destroy_hook(vnode);
                self.invoke_remove_hooks(vnode, elm);
            } else if let Some(parent) = self.backend.parent_node(elm) {
                self.backend.remove_child(parent, elm);
            }
        }
    }

    /// Hand every module a removal token and detach once all are released.
    fn invoke_remove_hooks(&mut self, vnode: &VNode, elm: NodeId) {
        let removal = Removal::new(elm);
        self.pending_removals.push((removal.watch(), elm));
        for module in self.modules.iter_mut() {
            module.remove(&mut self.backend, vnode, removal.clone());
        }
        trace!(%elm, "remove");
    }

    /// Patch `vnode` in place over `old`, which must be the same node.
    pub(super) fn patch_vnode(&mut self, old: &VNode, vnode: &mut VNode, queue: &mut InsertQueue) -> NodeId {
        let Some(elm) = old.elm else {
            return self.create_elm(vnode, queue, None, None);
        };
        vnode.elm = Some(elm);

        if vnode.is_static && old.is_static && vnode.key == old.key && (vnode.is_cloned || vnode.is_once) {
            vnode.children = old.children.clone();
            vnode.text = old.text.clone();
            return elm;
        }

        let hooks = vnode.node_hooks();
        if let Some(hooks) = &hooks {
            hooks.prepatch(old, vnode);
        }

        if vnode.data.is_some() && vnode.is_element() {
            for module in self.modules.iter_mut() {
                module.update(&mut self.backend, old, vnode);
            }
            if let Some(hooks) = &hooks {
                hooks.update(old, vnode);
            }
        }

        match vnode.own_text() {
            None => {
                let (has_old, has_new) = (!old.children.is_empty(), !vnode.children.is_empty());
                if has_old && has_new {
                    self.update_children(elm, &old.children, &mut vnode.children, queue);
                } else if has_new {
                    self.check_duplicate_keys(&vnode.children);
                    if old.own_text().is_some() {
                        self.backend.set_text_content(elm, "");
                    }
                    self.add_vnodes(elm, None, &mut vnode.children, queue);
                } else if has_old {
                    self.remove_vnodes(&old.children);
                } else if old.own_text().is_some() {
                    self.backend.set_text_content(elm, "");
                }
            }
            Some(text) => {
                if old.own_text() != Some(text) {
                    self.backend.set_text_content(elm, text);
                }
            }
        }

        if let Some(hooks) = &hooks {
            hooks.postpatch(old, vnode);
        }
        elm
    }

    /// Warn about siblings sharing a key.
    pub(super) fn check_duplicate_keys(&self, children: &[VNode]) {
        if !config::with(|c| c.check_duplicate_keys) {
            return;
        }
        let mut seen: HashSet<&Key> = HashSet::new();
        for key in children.iter().filter_map(|child| child.key.as_ref()) {
            if !seen.insert(key) {
                diagnostics::report_warning(&Error::DuplicateKey { key: key.clone() });
            }
        }
    }
}
