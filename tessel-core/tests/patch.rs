//! Integration Tests for the Patch Engine
//!
//! These tests drive the patcher against the in-memory backend and check
//! both the resulting tree and the number of structural operations.

use std::cell::RefCell;
use std::rc::Rc;

use tessel_core::config;
use tessel_core::diagnostics;
use tessel_core::reactive::{observe, Value, Watcher, WatcherOptions};
use tessel_core::scheduler::Runtime;
use tessel_core::vdom::{Backend, MemoryTree, NodeId, PatchTarget, Patcher, VNode};
use tessel_core::Error;

fn keyed_list(keys: &[i64]) -> VNode {
    VNode::element("ul").children(keys.iter().map(|&key| {
        VNode::element("li")
            .key(key)
            .attr("data-key", key.to_string())
            .with_text(format!("item {key}"))
    }))
}

fn child_texts(tree: &MemoryTree, root: NodeId) -> Vec<String> {
    tree.child_nodes(root)
        .into_iter()
        .map(|child| tree.text_content(child))
        .collect()
}

/// Test that patching a tree against an identical one touches nothing.
#[test]
fn identical_patch_is_a_no_op() {
    let mut patcher = Patcher::new(MemoryTree::new());
    let mut old = keyed_list(&[1, 2, 3, 4]);
    let root = patcher.patch(PatchTarget::None, &mut old, false);
    let before = patcher.backend().to_html(root);
    patcher.backend_mut().reset_stats();

    let mut same = keyed_list(&[1, 2, 3, 4]);
    patcher.patch(PatchTarget::VNode(&old), &mut same, false);

    let stats = patcher.backend().stats();
    assert_eq!(stats.created, 0);
    assert_eq!(stats.removed, 0);
    assert_eq!(stats.moved, 0);
    assert_eq!(patcher.backend().to_html(root), before);
}

/// Test that A -> B -> A restores the original structure and node identity.
#[test]
fn round_trip_restores_the_tree() {
    let mut patcher = Patcher::new(MemoryTree::new());
    let mut a = keyed_list(&[1, 2, 3, 4, 5]);
    let root = patcher.patch(PatchTarget::None, &mut a, false);
    let original_html = patcher.backend().to_html(root);
    let original_nodes = patcher.backend().child_nodes(root);

    let mut b = keyed_list(&[5, 3, 1, 6]);
    patcher.patch(PatchTarget::VNode(&a), &mut b, false);
    assert_eq!(
        child_texts(patcher.backend(), root),
        vec!["item 5", "item 3", "item 1", "item 6"]
    );

    let mut a_again = keyed_list(&[1, 2, 3, 4, 5]);
    patcher.patch(PatchTarget::VNode(&b), &mut a_again, false);
    assert_eq!(patcher.backend().to_html(root), original_html);

    // Keys that survived both patches kept their real node.
    let nodes = patcher.backend().child_nodes(root);
    assert_eq!(nodes[0], original_nodes[0]);
    assert_eq!(nodes[2], original_nodes[2]);
    assert_eq!(nodes[4], original_nodes[4]);
}

/// Test that rotating the last element to the front is exactly one move.
#[test]
fn rotation_is_a_single_move() {
    let mut patcher = Patcher::new(MemoryTree::new());
    let mut old = keyed_list(&[1, 2, 3, 4]);
    let root = patcher.patch(PatchTarget::None, &mut old, false);
    patcher.backend_mut().reset_stats();

    let mut rotated = keyed_list(&[4, 1, 2, 3]);
    patcher.patch(PatchTarget::VNode(&old), &mut rotated, false);

    let stats = patcher.backend().stats();
    assert_eq!(stats.moved, 1);
    assert_eq!((stats.created, stats.removed), (0, 0));
    assert_eq!(
        child_texts(patcher.backend(), root),
        vec!["item 4", "item 1", "item 2", "item 3"]
    );
}

/// Test that unkeyed siblings are diffed by position next to keyed ones.
#[test]
fn mixed_keyed_and_unkeyed_children() {
    let mut patcher = Patcher::new(MemoryTree::new());
    let mut old = VNode::element("div")
        .child(VNode::element("header").with_text("top"))
        .child(VNode::element("p").key("a").with_text("a"))
        .child(VNode::element("p").key("b").with_text("b"))
        .child(VNode::text("tail"));
    let root = patcher.patch(PatchTarget::None, &mut old, false);
    let header = old.children[0].elm;

    let mut new = VNode::element("div")
        .child(VNode::element("header").with_text("top!"))
        .child(VNode::element("p").key("b").with_text("b"))
        .child(VNode::element("p").key("a").with_text("a"))
        .child(VNode::text("tail"));
    patcher.patch(PatchTarget::VNode(&old), &mut new, false);

    assert_eq!(
        patcher.backend().to_html(root),
        "<div><header>top!</header><p>b</p><p>a</p>tail</div>"
    );
    assert_eq!(new.children[0].elm, header);
    assert_eq!(new.children[1].elm, old.children[2].elm);
}

/// Test that a key reused with a different tag replaces the node.
#[test]
fn key_collision_with_different_tag_replaces() {
    let mut patcher = Patcher::new(MemoryTree::new());
    let mut old = VNode::element("div")
        .child(VNode::element("span").key(1).with_text("x"))
        .child(VNode::element("span").key(2).with_text("y"))
        .child(VNode::element("span").key(3).with_text("z"));
    let root = patcher.patch(PatchTarget::None, &mut old, false);
    patcher.backend_mut().reset_stats();

    let mut new = VNode::element("div")
        .child(VNode::element("span").key(3).with_text("z"))
        .child(VNode::element("em").key(1).with_text("x"))
        .child(VNode::element("span").key(2).with_text("y"));
    patcher.patch(PatchTarget::VNode(&old), &mut new, false);

    assert_eq!(
        patcher.backend().to_html(root),
        "<div><span>z</span><em>x</em><span>y</span></div>"
    );
    assert_ne!(new.children[1].elm, old.children[0].elm);
    assert_eq!(new.children[2].elm, old.children[1].elm);
    assert_eq!(patcher.backend().stats().removed, 1);
}

/// Test that duplicate sibling keys are reported as warnings.
#[test]
fn duplicate_keys_warn() {
    let warnings = Rc::new(RefCell::new(Vec::new()));
    {
        let warnings = warnings.clone();
        diagnostics::set_warn_handler(move |err| {
            if let Error::DuplicateKey { key } = err {
                warnings.borrow_mut().push(key.to_string());
            }
        });
    }

    let mut patcher = Patcher::new(MemoryTree::new());
    let mut vnode = keyed_list(&[1, 2, 1]);
    let root = patcher.patch(PatchTarget::None, &mut vnode, false);
    assert_eq!(*warnings.borrow(), vec!["1"]);
    assert_eq!(patcher.backend().child_nodes(root).len(), 3);

    config::update(|c| c.check_duplicate_keys = false);
    let mut again = keyed_list(&[2, 2]);
    patcher.patch(PatchTarget::VNode(&vnode), &mut again, false);
    assert_eq!(warnings.borrow().len(), 1);

    diagnostics::clear_handlers();
}

/// Test that server-rendered markup is adopted without creating nodes.
#[test]
fn hydration_reuses_existing_nodes() {
    let mut patcher = Patcher::new(MemoryTree::new());
    let mut server = keyed_list(&[1, 2, 3]);
    let root = patcher.patch(PatchTarget::None, &mut server, false);
    patcher.backend_mut().reset_stats();

    let mut client = keyed_list(&[1, 2, 3]);
    let hydrated = patcher.patch(PatchTarget::Element(root), &mut client, true);
    assert_eq!(hydrated, root);
    assert_eq!(patcher.backend().stats().created, 0);

    // The hydrated tree patches like any other.
    let mut next = keyed_list(&[3, 2, 1]);
    patcher.patch(PatchTarget::VNode(&client), &mut next, false);
    assert_eq!(
        child_texts(patcher.backend(), root),
        vec!["item 3", "item 2", "item 1"]
    );
}

/// Test the whole pipeline: state change, batched render, minimal patch.
#[test]
fn render_watcher_patches_on_change() {
    let state = observe(serde_json::json!({ "items": [1, 2, 3], "title": "list" }));
    let patcher = Rc::new(RefCell::new(Patcher::new(MemoryTree::new())));
    let previous: Rc<RefCell<Option<VNode>>> = Rc::new(RefCell::new(None));

    let render = {
        let (state, patcher, previous) = (state.clone(), patcher.clone(), previous.clone());
        move || {
            let title = state.get("title").and_then(|v| v.as_str().map(str::to_owned));
            let items = state.get("items").and_then(|v| v.as_array().cloned());
            let mut vnode = VNode::element("section")
                .child(VNode::element("h2").with_text(title.unwrap_or_default()))
                .child(VNode::element("ol").children(items.iter().flat_map(|array| array.iter()).map(
                    |item: Value| {
                        let n = item.as_f64().unwrap_or_default();
                        VNode::element("li").key(n as i64).with_text(n.to_string())
                    },
                )));

            let mut patcher = patcher.borrow_mut();
            let mut previous = previous.borrow_mut();
            let target = match previous.as_ref() {
                Some(old) => PatchTarget::VNode(old),
                None => PatchTarget::None,
            };
            let root = patcher.patch(target, &mut vnode, false);
            *previous = Some(vnode);
            Ok(root)
        }
    };
    let watcher = Watcher::new(render, WatcherOptions::new().label("render")).unwrap();
    let root = watcher.value().unwrap();
    assert_eq!(
        patcher.borrow().backend().to_html(root),
        "<section><h2>list</h2><ol><li>1</li><li>2</li><li>3</li></ol></section>"
    );

    patcher.borrow_mut().backend_mut().reset_stats();
    let items = state.get("items").unwrap();
    let array = items.as_array().unwrap();
    array.unshift(0.0);
    array.pop();
    tessel_core::reactive::set(&state, "title", "updated");
    Runtime::tick().unwrap();

    assert_eq!(watcher.run_count(), 2);
    assert_eq!(
        patcher.borrow().backend().to_html(root),
        "<section><h2>updated</h2><ol><li>0</li><li>1</li><li>2</li></ol></section>"
    );
    let stats = patcher.borrow().backend().stats();
    assert_eq!(stats.moved, 0);
    assert_eq!(stats.removed, 1);
}
