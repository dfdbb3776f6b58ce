//! Hydration: adopting an existing real tree instead of creating one.

use tracing::trace;

use super::backend::{Backend, NodeId, NodeKind};
use super::patch::{InsertQueue, Patcher};
use super::vnode::VNode;
use crate::diagnostics;
use crate::error::{Error, Result};

fn describe_vnode(vnode: &VNode) -> String {
    match (&vnode.tag, vnode.is_comment) {
        (Some(tag), _) => format!("<{tag}>"),
        (None, true) => "comment".to_owned(),
        (None, false) => format!("text {:?}", vnode.text.as_deref().unwrap_or_default()),
    }
}

impl<B: Backend> Patcher<B> {
    /// Hydrate `elm` from `vnode`. On a mismatch the problem is reported as
    /// a warning, any queued insert hooks from the attempt are dropped, and
    /// `false` is returned so the caller can fall back to a full render.
    pub(super) fn try_hydrate(&mut self, elm: NodeId, vnode: &mut VNode, queue: &mut InsertQueue) -> bool {
        let queued = queue.len();
        match self.hydrate(elm, vnode, queue) {
            Ok(()) => true,
            Err(err) => {
                diagnostics::report_warning(&err);
                queue.truncate(queued);
                false
            }
        }
    }

    fn describe_node(&self, elm: NodeId) -> String {
        match self.backend.node_kind(elm) {
            NodeKind::Element => format!("<{}>", self.backend.tag_name(elm).unwrap_or_default()),
            NodeKind::Comment => "comment".to_owned(),
            NodeKind::Text => format!("text {:?}", self.backend.text_content(elm)),
        }
    }

    fn assert_node_match(&self, elm: NodeId, vnode: &VNode) -> Result<()> {
        let matches = match (&vnode.tag, self.backend.node_kind(elm)) {
            (Some(tag), NodeKind::Element) => self
                .backend
                .tag_name(elm)
                .is_some_and(|found| found.eq_ignore_ascii_case(tag)),
            (None, NodeKind::Comment) => vnode.is_comment,
            (None, NodeKind::Text) => !vnode.is_comment,
            _ => false,
        };
        if matches {
            Ok(())
        } else {
            Err(self.mismatch(vnode, elm))
        }
    }

    fn mismatch(&self, vnode: &VNode, elm: NodeId) -> Error {
        Error::HydrationMismatch {
            expected: describe_vnode(vnode),
            found: self.describe_node(elm),
        }
    }

    fn hydrate(&mut self, elm: NodeId, vnode: &mut VNode, queue: &mut InsertQueue) -> Result<()> {
        vnode.elm = Some(elm);
        self.assert_node_match(elm, vnode)?;
        trace!(%elm, "hydrate");

        if !vnode.is_element() {
            let text = vnode.text.as_deref().unwrap_or_default();
            if self.backend.text_content(elm) != text {
                self.backend.set_text_content(elm, text);
            }
            return Ok(());
        }

        let existing = self.backend.child_nodes(elm);
        if !vnode.children.is_empty() {
            if existing.is_empty() {
                self.check_duplicate_keys(&vnode.children);
                self.add_vnodes(elm, None, &mut vnode.children, queue);
            } else {
                let mut real = existing.iter().copied();
                for child in vnode.children.iter_mut() {
                    let Some(node) = real.next() else {
                        return Err(Error::HydrationMismatch {
                            expected: describe_vnode(child),
                            found: "nothing".to_owned(),
                        });
                    };
                    self.hydrate(node, child, queue)?;
                }
                if let Some(extra) = real.next() {
                    return Err(Error::HydrationMismatch {
                        expected: "end of children".to_owned(),
                        found: self.describe_node(extra),
                    });
                }
            }
        } else if let Some(text) = vnode.text.as_deref() {
            if self.backend.text_content(elm) != text {
                self.backend.set_text_content(elm, text);
            }
        }

        if vnode.data.is_some() {
            self.invoke_create_hooks(vnode);
            if let Some(hooks) = vnode.node_hooks() {
                queue.push((hooks, elm));
            }
        }
        Ok(())
    }
}
