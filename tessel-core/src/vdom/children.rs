//! Child-list reconciliation.
//!
//! # Algorithm
//!
//! Four cursors walk the two lists: old-start, old-end, new-start and
//! new-end (the ends are exclusive here). Each step tries, in order:
//!
//! 1. skip old-start or old-end if an earlier key lookup consumed it,
//! 2. old-start against new-start (nothing moved),
//! 3. old-end against new-end,
//! 4. old-start against new-end: the node moved right, behind old-end,
//! 5. old-end against new-start: the node moved left, before old-start,
//! 6. otherwise new-start's key is looked up in a key map over the
//!    unconsumed old range, built on first use. A hit that is the same node
//!    is patched and moved before old-start; a miss (or a key collision with
//!    a different tag) creates a fresh node there.
//!
//! When the old cursors cross first, the remaining new nodes are inserted in
//! bulk; when the new cursors cross first, the remaining old nodes are
//! removed.
//!
//! Appends, prepends, in-place updates and single moves never reach step 6,
//! so they cost no allocation beyond the consumed mask.

use std::collections::HashMap;

use tracing::trace;

use super::backend::{Backend, NodeId};
use super::patch::{InsertQueue, Patcher};
use super::vnode::{same_vnode, Key, VNode};

impl<B: Backend> Patcher<B> {
    pub(super) fn update_children(
        &mut self,
        parent: NodeId,
        old_ch: &[VNode],
        new_ch: &mut [VNode],
        queue: &mut InsertQueue,
    ) {
        self.check_duplicate_keys(new_ch);

        let mut consumed = vec![false; old_ch.len()];
        let mut key_map: Option<HashMap<&Key, usize>> = None;

        let (mut old_start, mut old_end) = (0, old_ch.len());
        let (mut new_start, mut new_end) = (0, new_ch.len());

        while old_start < old_end && new_start < new_end {
            if consumed[old_start] {
                old_start += 1;
                continue;
            }
            if consumed[old_end - 1] {
                old_end -= 1;
                continue;
            }

            let old_first = &old_ch[old_start];
            let old_last = &old_ch[old_end - 1];

            if same_vnode(old_first, &new_ch[new_start]) {
                self.patch_vnode(old_first, &mut new_ch[new_start], queue);
                old_start += 1;
                new_start += 1;
            } else if same_vnode(old_last, &new_ch[new_end - 1]) {
                self.patch_vnode(old_last, &mut new_ch[new_end - 1], queue);
                old_end -= 1;
                new_end -= 1;
            } else if same_vnode(old_first, &new_ch[new_end - 1]) {
                let elm = self.patch_vnode(old_first, &mut new_ch[new_end - 1], queue);
                let after = old_last.elm.and_then(|last| self.backend.next_sibling(last));
                trace!(%elm, "move right");
                self.backend.insert_before(parent, elm, after);
                old_start += 1;
                new_end -= 1;
            } else if same_vnode(old_last, &new_ch[new_start]) {
                let elm = self.patch_vnode(old_last, &mut new_ch[new_start], queue);
                trace!(%elm, "move left");
                self.backend.insert_before(parent, elm, old_first.elm);
                old_end -= 1;
                new_start += 1;
            } else {
                let found = match &new_ch[new_start].key {
                    Some(key) => key_map
                        .get_or_insert_with(|| build_key_map(old_ch, &consumed, old_start, old_end))
                        .get(key)
                        .copied(),
                    None => find_unkeyed(&new_ch[new_start], old_ch, &consumed, old_start, old_end),
                };

                match found {
                    Some(index)
                        if index >= old_start
                            && index < old_end
                            && !consumed[index]
                            && same_vnode(&old_ch[index], &new_ch[new_start]) =>
                    {
                        let elm = self.patch_vnode(&old_ch[index], &mut new_ch[new_start], queue);
                        consumed[index] = true;
                        trace!(%elm, "move to key position");
                        self.backend.insert_before(parent, elm, old_first.elm);
                    }
                    _ => {
                        self.create_elm(&mut new_ch[new_start], queue, Some(parent), old_first.elm);
                    }
                }
                new_start += 1;
            }
        }

        if old_start >= old_end {
            let reference = new_ch.get(new_end).and_then(|vnode| vnode.elm);
            self.add_vnodes(parent, reference, &mut new_ch[new_start..new_end], queue);
        } else if new_start >= new_end {
            let stale = old_ch[old_start..old_end]
                .iter()
                .zip(&consumed[old_start..old_end])
                .filter(|&(_, &done)| !done)
                .map(|(vnode, _)| vnode);
            self.remove_vnodes(stale);
        }
    }
}

fn build_key_map<'a>(
    old_ch: &'a [VNode],
    consumed: &[bool],
    start: usize,
    end: usize,
) -> HashMap<&'a Key, usize> {
    (start..end)
        .filter(|&index| !consumed[index])
        .filter_map(|index| old_ch[index].key.as_ref().map(|key| (key, index)))
        .collect()
}

/// Unkeyed nodes are matched by a scan for the first same node.
fn find_unkeyed(
    vnode: &VNode,
    old_ch: &[VNode],
    consumed: &[bool],
    start: usize,
    end: usize,
) -> Option<usize> {
    (start..end).find(|&index| !consumed[index] && same_vnode(&old_ch[index], vnode))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vdom::{MemoryTree, PatchTarget};

    fn list(keys: &[i64]) -> VNode {
        VNode::element("ul").children(
            keys.iter()
                .map(|&key| VNode::element("li").key(key).with_text(key.to_string())),
        )
    }

    fn rendered_keys(patcher: &Patcher<MemoryTree>, root: NodeId) -> Vec<String> {
        patcher
            .backend()
            .child_nodes(root)
            .into_iter()
            .map(|child| patcher.backend().text_content(child))
            .collect()
    }

    fn repatch(from: &[i64], to: &[i64]) -> (Patcher<MemoryTree>, NodeId, VNode) {
        let mut patcher = Patcher::new(MemoryTree::new());
        let mut old = list(from);
        let root = patcher.patch(PatchTarget::None, &mut old, false);
        patcher.backend_mut().reset_stats();
        let mut new = list(to);
        patcher.patch(PatchTarget::VNode(&old), &mut new, false);
        (patcher, root, new)
    }

    fn strings(keys: &[i64]) -> Vec<String> {
        keys.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn append_and_prepend_create_only_new_nodes() {
        let (patcher, root, _) = repatch(&[1, 2], &[0, 1, 2, 3]);
        assert_eq!(rendered_keys(&patcher, root), strings(&[0, 1, 2, 3]));
        let stats = patcher.backend().stats();
        assert_eq!(stats.moved, 0);
        assert_eq!(stats.removed, 0);
        // Two <li> plus their text nodes.
        assert_eq!(stats.created, 4);
    }

    #[test]
    fn moving_first_to_last_is_one_move() {
        let (patcher, root, _) = repatch(&[1, 2, 3, 4], &[2, 3, 4, 1]);
        assert_eq!(rendered_keys(&patcher, root), strings(&[2, 3, 4, 1]));
        assert_eq!(patcher.backend().stats().moved, 1);
    }

    #[test]
    fn swap_ends() {
        let (patcher, root, _) = repatch(&[1, 2, 3, 4], &[4, 2, 3, 1]);
        assert_eq!(rendered_keys(&patcher, root), strings(&[4, 2, 3, 1]));
        assert_eq!(patcher.backend().stats().created, 0);
    }

    #[test]
    fn arbitrary_shuffle_uses_key_map() {
        let (patcher, root, new) = repatch(&[1, 2, 3, 4, 5], &[3, 5, 1, 4, 2]);
        assert_eq!(rendered_keys(&patcher, root), strings(&[3, 5, 1, 4, 2]));
        let stats = patcher.backend().stats();
        assert_eq!((stats.created, stats.removed), (0, 0));
        assert!(new.children.iter().all(|child| child.elm.is_some()));
    }

    #[test]
    fn removes_and_replaces_in_the_middle() {
        let (patcher, root, _) = repatch(&[1, 2, 3, 4], &[1, 5, 4]);
        assert_eq!(rendered_keys(&patcher, root), strings(&[1, 5, 4]));
        let stats = patcher.backend().stats();
        assert_eq!(stats.removed, 2);
    }

    #[test]
    fn clearing_removes_everything() {
        let (patcher, root, _) = repatch(&[1, 2, 3], &[]);
        assert!(rendered_keys(&patcher, root).is_empty());
        assert_eq!(patcher.backend().stats().removed, 3);
    }
}
