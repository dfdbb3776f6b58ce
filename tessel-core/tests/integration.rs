//! Integration Tests for the Reactive System
//!
//! These tests verify that reactive properties, watchers and the scheduler
//! work together correctly.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::json;
use tessel_core::config;
use tessel_core::diagnostics;
use tessel_core::reactive::{
    observe, set, watch, watch_path, Computed, Reactive, ReactiveContext, Watcher, WatcherOptions,
};
use tessel_core::scheduler::{Runtime, Scheduler};
use tessel_core::Error;

/// Test that a watcher only depends on what its latest evaluation read.
#[test]
fn dependency_set_follows_the_latest_evaluation() {
    let show_detail = Reactive::new(true);
    let detail = Reactive::new(String::from("detail"));
    let summary = Reactive::new(String::from("summary"));

    let (s, d, m) = (show_detail.clone(), detail.clone(), summary.clone());
    let watcher = Watcher::new(
        move || Ok(if s.get() { d.get() } else { m.get() }),
        WatcherOptions::new(),
    )
    .unwrap();

    assert!(watcher.depends_on(detail.dep()));
    assert!(!watcher.depends_on(summary.dep()));

    show_detail.set(false);
    Runtime::tick().unwrap();

    assert_eq!(watcher.value().as_deref(), Some("summary"));
    assert!(!watcher.depends_on(detail.dep()));
    assert!(watcher.depends_on(summary.dep()));
    assert_eq!(detail.dep().subscriber_count(), 0);

    // The unsubscribed branch no longer triggers anything.
    detail.set("changed".into());
    assert!(!Runtime::has_pending());
}

/// Test that many synchronous mutations cause exactly one run.
#[test]
fn mutations_collapse_into_one_run() {
    let state = observe(json!({ "a": 1, "b": 2, "c": 3 }));
    let object = state.as_object().unwrap().clone();

    let o = object.clone();
    let render = Watcher::new(
        move || {
            Ok(["a", "b", "c"]
                .iter()
                .filter_map(|key| o.get(key).and_then(|v| v.as_f64()))
                .sum::<f64>())
        },
        WatcherOptions::new().label("render"),
    )
    .unwrap();

    for i in 0..50 {
        object.set("a", f64::from(i));
        object.set("b", f64::from(i * 2));
        object.set("c", f64::from(i * 3));
    }
    Runtime::tick().unwrap();

    assert_eq!(render.run_count(), 2);
    assert_eq!(render.value(), Some(49.0 * 6.0));
}

/// Test that a parent watcher runs before a child created after it.
#[test]
fn parents_run_before_children() {
    let shared = Reactive::new(0);
    let order = Rc::new(RefCell::new(Vec::new()));

    let make = |name: &'static str| {
        let (s, o) = (shared.clone(), order.clone());
        Watcher::new(
            move || {
                o.borrow_mut().push(name);
                Ok(s.get())
            },
            WatcherOptions::new(),
        )
        .unwrap()
    };
    let parent = make("parent");
    let child = make("child");
    assert!(parent.id() < child.id());
    order.borrow_mut().clear();

    shared.set(1);
    Runtime::tick().unwrap();
    assert_eq!(*order.borrow(), vec!["parent", "child"]);
}

/// Test that a self-triggering watcher is stopped and the flush completes.
#[test]
fn runaway_watcher_is_aborted() {
    config::update(|c| c.max_update_count = 100);
    let errors = Rc::new(RefCell::new(Vec::new()));
    {
        let errors = errors.clone();
        diagnostics::set_error_handler(move |err| {
            if let Error::InfiniteUpdateLoop { limit, .. } = err {
                errors.borrow_mut().push(*limit);
            }
        });
    }

    let counter = Reactive::new(0u32);
    let c = counter.clone();
    let looping = watch(
        move || Ok(c.get()),
        {
            let c = counter.clone();
            move |value: &u32, _| {
                c.set(value + 1);
            }
        },
    )
    .unwrap();

    let other = Reactive::new(0);
    let seen = Rc::new(Cell::new(0));
    let (o, s) = (other.clone(), seen.clone());
    let _bystander = watch(move || Ok(o.get()), move |value: &i32, _| s.set(*value)).unwrap();

    counter.set(1);
    other.set(7);
    Runtime::tick().unwrap();

    assert_eq!(*errors.borrow(), vec![100]);
    assert_eq!(looping.run_count(), 101);
    assert_eq!(seen.get(), 7);
    diagnostics::clear_handlers();
}

/// Test that pushing onto an observed array is reactive end to end.
#[test]
fn array_push_is_intercepted() {
    let state = observe(json!({ "todos": [{ "title": "write", "done": false }] }));

    let s = state.clone();
    let count = Computed::new(move || {
        s.get("todos")
            .and_then(|todos| todos.as_array().map(|array| array.len()))
            .unwrap_or(0)
    });
    let c = count.clone();
    let lengths = Rc::new(RefCell::new(Vec::new()));
    let l = lengths.clone();
    let _watcher = watch(move || Ok(c.get()?), move |len: &usize, _| l.borrow_mut().push(*len)).unwrap();

    let todos = state.get("todos").unwrap();
    let array = todos.as_array().unwrap();
    array.push(json!({ "title": "test", "done": false }));
    Runtime::tick().unwrap();
    assert_eq!(*lengths.borrow(), vec![2]);

    // The pushed element is reactive too.
    let pushed = array.get_untracked(1).unwrap();
    let done = Rc::new(Cell::new(false));
    let (p, d) = (pushed.clone(), done.clone());
    let _done_watcher = watch(
        move || Ok(p.get("done").and_then(|v| v.as_bool()).unwrap_or(false)),
        move |value: &bool, _| d.set(*value),
    )
    .unwrap();
    assert!(set(&pushed, "done", true));
    Runtime::tick().unwrap();
    assert!(done.get());
}

/// Test that keys added after observation are picked up through `set`.
#[test]
fn added_keys_are_reactive() {
    let state = observe(json!({ "user": {} }));
    let names = Rc::new(RefCell::new(Vec::new()));
    let n = names.clone();
    let _watcher = watch_path(&state, "user.name", move |name, _| {
        n.borrow_mut().push(name.as_str().unwrap_or("<none>").to_owned());
    })
    .unwrap();

    let user = state.get("user").unwrap();
    assert!(set(&user, "name", "ada"));
    Runtime::tick().unwrap();
    assert_eq!(*names.borrow(), vec!["ada"]);

    assert!(tessel_core::reactive::delete(&user, "name"));
    Runtime::tick().unwrap();
    assert_eq!(*names.borrow(), vec!["ada", "<none>"]);
}

/// Test that deep watchers see nested mutations.
#[test]
fn deep_watcher_sees_nested_changes() {
    let state = observe(json!({ "settings": { "theme": { "dark": false } } }));
    let calls = Rc::new(Cell::new(0));

    let (s, c) = (state.clone(), calls.clone());
    let _watcher = Watcher::with_callback(
        move || Ok(s.get("settings").unwrap_or_default()),
        move |_, _| c.set(c.get() + 1),
        WatcherOptions::new().deep().user(),
    )
    .unwrap();

    let theme = state.get_path("settings.theme").unwrap();
    set(&theme, "dark", true);
    Runtime::tick().unwrap();
    assert_eq!(calls.get(), 1);
}

/// Test that untracked reads do not create dependencies.
#[test]
fn untracked_reads_are_ignored() {
    let tracked = Reactive::new(1);
    let ignored = Reactive::new(2);
    let (t, i) = (tracked.clone(), ignored.clone());
    let watcher = Watcher::new(
        move || Ok(t.get() + ReactiveContext::untracked(|| i.get())),
        WatcherOptions::new(),
    )
    .unwrap();

    assert!(watcher.depends_on(tracked.dep()));
    assert!(!watcher.depends_on(ignored.dep()));
    assert_eq!(ReactiveContext::depth(), 0);
}

/// Test that callbacks deferred after a mutation observe the flushed state.
#[test]
fn next_tick_sees_flushed_state() {
    let count = Reactive::new(0);
    let c = count.clone();
    let doubled = Watcher::new(move || Ok(c.get() * 2), WatcherOptions::new()).unwrap();

    count.set(21);
    let seen = Rc::new(Cell::new(0));
    let (d, s) = (doubled.clone(), seen.clone());
    Runtime::next_tick(move || s.set(d.value().unwrap_or(0)));

    assert_eq!(Scheduler::pending_count(), 1);
    Runtime::tick().unwrap();
    assert_eq!(seen.get(), 42);
}

/// Test that sync watchers may change a dep's subscribers while it notifies.
#[test]
fn notify_tolerates_subscriber_changes() {
    let source = Reactive::new(0);
    let other = Reactive::new(0);

    // Stops reading `source` once it is non-zero.
    let (s, o) = (source.clone(), other.clone());
    let switching = Watcher::new(
        move || Ok(if s.get() == 0 { 0 } else { o.get() }),
        WatcherOptions::new().sync(),
    )
    .unwrap();

    // Subscribes a new watcher to `source` from inside the notification.
    let spawned = Rc::new(RefCell::new(Vec::new()));
    let s = source.clone();
    let spawning = Watcher::with_callback(
        move || Ok(s.get()),
        {
            let (s, spawned) = (source.clone(), spawned.clone());
            move |_: &i32, _| {
                let s = s.clone();
                let watcher = Watcher::new(move || Ok(s.get()), WatcherOptions::new().sync()).unwrap();
                spawned.borrow_mut().push(watcher);
            }
        },
        WatcherOptions::new().sync(),
    )
    .unwrap();

    let s = source.clone();
    let rereading = Watcher::new(move || Ok(s.get() + s.get()), WatcherOptions::new().sync()).unwrap();

    source.set(1);
    assert!(!switching.depends_on(source.dep()));
    assert!(switching.depends_on(other.dep()));
    assert_eq!(spawning.run_count(), 2);
    assert_eq!(rereading.value(), Some(2));

    // The watcher created mid-notification was not part of that notification.
    assert_eq!(spawned.borrow().len(), 1);
    assert_eq!(spawned.borrow()[0].run_count(), 1);
    assert_eq!(source.dep().subscriber_count(), 3);

    source.set(2);
    assert_eq!(spawned.borrow().len(), 2);
    assert_eq!(spawned.borrow()[0].run_count(), 2);
    assert_eq!(rereading.value(), Some(4));
}
