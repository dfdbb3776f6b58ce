//! An in-memory output tree.
//!
//! `MemoryTree` stores nodes in an arena and counts the structural
//! operations performed on it, which is what the patch tests assert on.

use std::fmt::Write as _;

use indexmap::IndexMap;

use super::backend::{Backend, NodeId, NodeKind};

/// Structural operation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpStats {
    /// Nodes created.
    pub created: usize,
    /// Insertions of nodes that had no parent.
    pub inserted: usize,
    /// Insertions of nodes that already had a parent.
    pub moved: usize,
    /// Nodes detached by `remove_child`.
    pub removed: usize,
}

#[derive(Debug)]
struct MemoryNode {
    kind: NodeKind,
    tag: String,
    text: String,
    attrs: IndexMap<String, String>,
    style: IndexMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl MemoryNode {
    fn new(kind: NodeKind, tag: &str, text: &str) -> Self {
        Self {
            kind,
            tag: tag.to_owned(),
            text: text.to_owned(),
            attrs: IndexMap::new(),
            style: IndexMap::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Arena-backed [`Backend`].
#[derive(Debug, Default)]
pub struct MemoryTree {
    nodes: Vec<MemoryNode>,
    stats: OpStats,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> OpStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = OpStats::default();
    }

    /// Number of nodes ever allocated.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node(&self, id: NodeId) -> &MemoryNode {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut MemoryNode {
        &mut self.nodes[id.0]
    }

    fn alloc(&mut self, node: MemoryNode) -> NodeId {
        self.stats.created += 1;
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.node_mut(node).parent.take() {
            self.node_mut(parent).children.retain(|&child| child != node);
        }
    }

    /// Serialize `node` and its subtree as HTML.
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        match node.kind {
            NodeKind::Text => out.push_str(&escape(&node.text)),
            NodeKind::Comment => {
                let _ = write!(out, "<!--{}-->", node.text);
            }
            NodeKind::Element => {
                out.push('<');
                out.push_str(&node.tag);
                for (name, value) in &node.attrs {
                    let _ = write!(out, " {}=\"{}\"", name, escape(value));
                }
                if !node.style.is_empty() {
                    let style: Vec<String> = node
                        .style
                        .iter()
                        .map(|(property, value)| format!("{property}: {value};"))
                        .collect();
                    let _ = write!(out, " style=\"{}\"", escape(&style.join(" ")));
                }
                out.push('>');
                for &child in &node.children {
                    self.write_html(child, out);
                }
                let _ = write!(out, "</{}>", node.tag);
            }
        }
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

impl Backend for MemoryTree {
    fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(MemoryNode::new(NodeKind::Element, tag, ""))
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(MemoryNode::new(NodeKind::Text, "", text))
    }

    fn create_comment(&mut self, text: &str) -> NodeId {
        self.alloc(MemoryNode::new(NodeKind::Comment, "", text))
    }

    fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>) {
        if self.node(node).parent.is_some() {
            self.stats.moved += 1;
            self.detach(node);
        } else {
            self.stats.inserted += 1;
        }
        let children = &mut self.node_mut(parent).children;
        let at = reference
            .and_then(|reference| children.iter().position(|&child| child == reference))
            .unwrap_or(children.len());
        children.insert(at, node);
        self.node_mut(node).parent = Some(parent);
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        if self.node(child).parent == Some(parent) {
            self.stats.removed += 1;
            self.detach(child);
        }
    }

    fn parent_node(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.node(node).parent?;
        let siblings = &self.node(parent).children;
        let at = siblings.iter().position(|&child| child == node)?;
        siblings.get(at + 1).copied()
    }

    fn child_nodes(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node).children.clone()
    }

    fn node_kind(&self, node: NodeId) -> NodeKind {
        self.node(node).kind
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        let node = self.node(node);
        match node.kind {
            NodeKind::Element => Some(&node.tag),
            _ => None,
        }
    }

    fn text_content(&self, node: NodeId) -> String {
        let data = self.node(node);
        match data.kind {
            NodeKind::Element => data
                .children
                .iter()
                .filter(|&&child| self.node_kind(child) != NodeKind::Comment)
                .map(|&child| self.text_content(child))
                .collect(),
            _ => data.text.clone(),
        }
    }

    fn set_text_content(&mut self, node: NodeId, text: &str) {
        if self.node(node).kind != NodeKind::Element {
            self.node_mut(node).text = text.to_owned();
            return;
        }
        for child in std::mem::take(&mut self.node_mut(node).children) {
            self.node_mut(child).parent = None;
        }
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.node_mut(text_node).parent = Some(node);
            self.node_mut(node).children.push(text_node);
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node).attrs.get(name).map(String::as_str)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        self.node_mut(node)
            .attrs
            .insert(name.to_owned(), value.to_owned());
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        self.node_mut(node).attrs.shift_remove(name);
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        self.node_mut(node)
            .style
            .insert(property.to_owned(), value.to_owned());
    }

    fn remove_style(&mut self, node: NodeId, property: &str) {
        self.node_mut(node).style.shift_remove(property);
    }
}
