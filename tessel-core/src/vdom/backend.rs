//! The output-tree interface the patcher drives.

use std::fmt;

use crate::reactive::WatchValue;

/// Handle to a real node: an index into the backend's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

// Render watchers yield the root they patched.
impl WatchValue for NodeId {
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    Comment,
}

/// Node operations of a concrete output tree.
///
/// `insert_before` with a node that already has a parent moves it; the
/// backend detaches it from its old position first.
pub trait Backend {
    fn create_element(&mut self, tag: &str) -> NodeId;
    fn create_text(&mut self, text: &str) -> NodeId;
    fn create_comment(&mut self, text: &str) -> NodeId;

    /// Insert `node` into `parent` before `reference`, or at the end when
    /// `reference` is `None`.
    fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>);

    fn append_child(&mut self, parent: NodeId, node: NodeId) {
        self.insert_before(parent, node, None);
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId);

    fn parent_node(&self, node: NodeId) -> Option<NodeId>;
    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;
    fn child_nodes(&self, node: NodeId) -> Vec<NodeId>;

    fn node_kind(&self, node: NodeId) -> NodeKind;
    /// Tag of an element, `None` for text and comments.
    fn tag_name(&self, node: NodeId) -> Option<&str>;

    /// Data of a text or comment node, concatenated text of an element.
    fn text_content(&self, node: NodeId) -> String;
    /// Replace the data of a text or comment node, or all children of an
    /// element with a single text node.
    fn set_text_content(&mut self, node: NodeId, text: &str);

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);
    fn remove_attribute(&mut self, node: NodeId, name: &str);

    fn set_style(&mut self, node: NodeId, property: &str, value: &str);
    fn remove_style(&mut self, node: NodeId, property: &str);
}
