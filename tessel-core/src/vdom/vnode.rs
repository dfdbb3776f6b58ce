//! Virtual nodes.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::backend::NodeId;

/// Sibling identity used by the child diff.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(n) => write!(f, "{n}"),
            Key::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Int(n)
    }
}

impl From<i32> for Key {
    fn from(n: i32) -> Self {
        Key::Int(n.into())
    }
}

impl From<u32> for Key {
    fn from(n: u32) -> Self {
        Key::Int(n.into())
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_owned())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

/// Per-node lifecycle hooks.
///
/// Every method has an empty default, so implementors only override what
/// they need.
pub trait VNodeHooks {
    /// The real node was created (and modules have run their `create`).
    fn create(&self, _vnode: &VNode) {}

    /// The real node is in the tree. Called after the whole patch finished.
    fn insert(&self, _elm: NodeId) {}

    /// Before an in-place patch.
    fn prepatch(&self, _old: &VNode, _new: &VNode) {}

    /// After modules updated the node during an in-place patch.
    fn update(&self, _old: &VNode, _new: &VNode) {}

    /// After children were reconciled.
    fn postpatch(&self, _old: &VNode, _new: &VNode) {}

    /// The node is being removed or replaced.
    fn destroy(&self, _vnode: &VNode) {}
}

/// Attributes, classes, styles and hooks of a virtual element.
#[derive(Clone, Default)]
pub struct VNodeData {
    pub attrs: IndexMap<String, String>,
    pub classes: Vec<String>,
    pub style: IndexMap<String, String>,
    pub hooks: Option<Rc<dyn VNodeHooks>>,
}

impl fmt::Debug for VNodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VNodeData")
            .field("attrs", &self.attrs)
            .field("classes", &self.classes)
            .field("style", &self.style)
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

/// A description of one node of the output tree.
///
/// Element nodes have a `tag`. Nodes without one are text nodes, or comment
/// nodes when `is_comment` is set; their content lives in `text`. An element
/// with `text` and no children renders as that text.
///
/// `elm` is filled in by the patcher and points at the real node the vnode
/// was rendered to.
#[derive(Debug, Clone, Default)]
pub struct VNode {
    pub tag: Option<String>,
    pub key: Option<Key>,
    pub data: Option<VNodeData>,
    pub children: Vec<VNode>,
    pub text: Option<String>,
    pub elm: Option<NodeId>,
    pub is_comment: bool,
    /// Hoisted subtree that can never change.
    pub is_static: bool,
    pub is_cloned: bool,
    /// Rendered once, never patched again.
    pub is_once: bool,
}

impl VNode {
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            is_comment: true,
            ..Self::default()
        }
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// The node's data, created empty if absent.
    pub fn data_mut(&mut self) -> &mut VNodeData {
        self.data.get_or_insert_with(VNodeData::default)
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.data_mut().attrs.insert(name.into(), value.into());
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.data_mut().classes.push(class.into());
        self
    }

    pub fn style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.data_mut().style.insert(property.into(), value.into());
        self
    }

    pub fn hooks(mut self, hooks: Rc<dyn VNodeHooks>) -> Self {
        self.data_mut().hooks = Some(hooks);
        self
    }

    pub fn child(mut self, child: VNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = VNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Text content of an element. Children take precedence: an element
    /// that has children renders them and ignores its text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn mark_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn mark_cloned(mut self) -> Self {
        self.is_cloned = true;
        self
    }

    pub fn mark_once(mut self) -> Self {
        self.is_once = true;
        self
    }

    pub fn is_element(&self) -> bool {
        self.tag.is_some()
    }

    /// The text to render, `None` when children take precedence.
    pub(crate) fn own_text(&self) -> Option<&str> {
        if self.children.is_empty() {
            self.text.as_deref()
        } else {
            None
        }
    }

    pub(crate) fn node_hooks(&self) -> Option<Rc<dyn VNodeHooks>> {
        self.data.as_ref().and_then(|data| data.hooks.clone())
    }

    fn input_type(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|data| data.attrs.get("type"))
            .map(String::as_str)
    }
}

/// Whether two vnodes describe the same node, so the old real node can be
/// patched in place instead of replaced.
pub fn same_vnode(a: &VNode, b: &VNode) -> bool {
    a.key == b.key
        && a.tag == b.tag
        && a.is_comment == b.is_comment
        && a.data.is_some() == b.data.is_some()
        && same_input_type(a, b)
}

fn same_input_type(a: &VNode, b: &VNode) -> bool {
    if a.tag.as_deref() != Some("input") {
        return true;
    }
    a.input_type() == b.input_type()
}
