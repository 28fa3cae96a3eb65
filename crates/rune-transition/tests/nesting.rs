use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use rune_transition::{
    Callbacks, EventRecorder, LifecycleEvent, TransitionEvent, TransitionState, TransitionTree,
};
use TransitionState::*;

type Log = Rc<RefCell<Vec<String>>>;

/// Callbacks recording `on_transition` plus the listed directional events.
fn spy(log: &Log, events: &[LifecycleEvent]) -> Callbacks {
    let mut callbacks = {
        let log = log.clone();
        Callbacks::new().with_transition(move |p, n| log.borrow_mut().push(format!("{p}->{n}")))
    };
    for &event in events {
        let log = log.clone();
        callbacks = callbacks.on(event, move || log.borrow_mut().push(event.to_string()));
    }
    callbacks
}

fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

#[test]
fn leaf_alone_comes_in_on_mount() -> Result<()> {
    let log: Log = Rc::default();
    let mut tree = TransitionTree::new();
    tree.mount_listener(None, spy(&log, &[LifecycleEvent::DidComeIn]))?;

    assert_eq!(entries(&log), vec!["did_come_in"]);
    Ok(())
}

#[test]
fn leaf_alone_leaves_on_unmount() -> Result<()> {
    let log: Log = Rc::default();
    let mut tree = TransitionTree::new();
    let leaf = tree.mount_listener(
        None,
        spy(&log, &[LifecycleEvent::WillLeave, LifecycleEvent::DidLeave]),
    )?;
    assert!(entries(&log).is_empty());

    tree.unmount(leaf)?;
    assert_eq!(entries(&log), vec!["will_leave", "did_leave"]);
    Ok(())
}

#[test]
fn in_node_delivers_a_single_did_come_in() -> Result<()> {
    let log: Log = Rc::default();
    let mut tree = TransitionTree::new();
    let node = tree.mount_node(None, In)?;
    tree.mount_listener(Some(node), spy(&log, &[LifecycleEvent::DidComeIn]))?;
    assert_eq!(entries(&log), vec!["did_come_in"]);

    tree.set_declared_state(node, In)?;
    assert_eq!(entries(&log), vec!["did_come_in"]);
    Ok(())
}

#[test]
fn appearing_node_defers_did_come_in_until_in() -> Result<()> {
    let log: Log = Rc::default();
    let mut tree = TransitionTree::new();
    let node = tree.mount_node(None, Appearing)?;
    tree.mount_listener(
        Some(node),
        spy(&log, &[LifecycleEvent::DidAppear, LifecycleEvent::DidComeIn]),
    )?;
    assert!(entries(&log).is_empty());

    tree.set_declared_state(node, In)?;
    assert_eq!(entries(&log), vec!["appearing->in", "did_appear", "did_come_in"]);
    Ok(())
}

#[test]
fn child_out_never_transitions() -> Result<()> {
    let recorder = EventRecorder::new();
    let mut tree = TransitionTree::new();
    let outer = tree.mount_node(None, Out)?;
    let inner = tree.mount_node(Some(outer), Out)?;
    tree.mount_listener(Some(inner), recorder.callbacks("leaf"))?;

    for state in [Appearing, In, Leaving, Out] {
        tree.set_declared_state(outer, state)?;
        assert_eq!(tree.effective_state(inner)?, Out);
    }

    assert!(recorder.is_empty(), "unexpected events: {:?}", recorder.events());
    Ok(())
}

#[test]
fn child_in_follows_parent_appearing() -> Result<()> {
    let log: Log = Rc::default();
    let mut tree = TransitionTree::new();
    let outer = tree.mount_node(None, Out)?;
    let inner = tree.mount_node(Some(outer), In)?;
    tree.mount_listener(
        Some(inner),
        spy(
            &log,
            &[
                LifecycleEvent::WillAppear,
                LifecycleEvent::DidAppear,
                LifecycleEvent::DidComeIn,
            ],
        ),
    )?;
    assert!(entries(&log).is_empty());

    tree.set_declared_state(outer, Appearing)?;
    assert_eq!(entries(&log), vec!["out->appearing", "will_appear"]);

    tree.set_declared_state(outer, In)?;
    assert_eq!(
        entries(&log),
        vec![
            "out->appearing",
            "will_appear",
            "appearing->in",
            "did_appear",
            "did_come_in",
        ]
    );
    Ok(())
}

#[test]
fn child_in_follows_parent_entering() -> Result<()> {
    let log: Log = Rc::default();
    let mut tree = TransitionTree::new();
    let outer = tree.mount_node(None, Out)?;
    let inner = tree.mount_node(Some(outer), In)?;
    tree.mount_listener(
        Some(inner),
        spy(
            &log,
            &[
                LifecycleEvent::WillEnter,
                LifecycleEvent::WillComeIn,
                LifecycleEvent::DidEnter,
            ],
        ),
    )?;

    tree.set_declared_state(outer, Entering)?;
    tree.set_declared_state(outer, In)?;
    assert_eq!(
        entries(&log),
        vec![
            "out->entering",
            "will_enter",
            "will_come_in",
            "entering->in",
            "did_enter",
        ]
    );
    Ok(())
}

#[test]
fn child_in_follows_parent_leaving() -> Result<()> {
    let log: Log = Rc::default();
    let mut tree = TransitionTree::new();
    let outer = tree.mount_node(None, In)?;
    let inner = tree.mount_node(Some(outer), In)?;
    tree.mount_listener(
        Some(inner),
        spy(&log, &[LifecycleEvent::WillLeave, LifecycleEvent::DidLeave]),
    )?;

    tree.set_declared_state(outer, Leaving)?;
    assert_eq!(entries(&log), vec!["in->leaving", "will_leave"]);

    tree.set_declared_state(outer, Out)?;
    assert_eq!(
        entries(&log),
        vec!["in->leaving", "will_leave", "leaving->out", "did_leave"]
    );
    Ok(())
}

#[test]
fn unmounting_the_leaf_synthesises_leave() -> Result<()> {
    let log: Log = Rc::default();
    let mut tree = TransitionTree::new();
    let outer = tree.mount_node(None, In)?;
    let inner = tree.mount_node(Some(outer), In)?;
    let leaf = tree.mount_listener(Some(inner), spy(&log, &[LifecycleEvent::DidLeave]))?;
    assert!(entries(&log).is_empty());

    tree.unmount(leaf)?;
    assert_eq!(entries(&log), vec!["in->out", "did_leave"]);
    assert_eq!(tree.node(inner)?.listener_count(), 0);
    Ok(())
}

#[test]
fn unmounting_the_parent_leaves_exactly_once() -> Result<()> {
    let log: Log = Rc::default();
    let mut tree = TransitionTree::new();
    let outer = tree.mount_node(None, In)?;
    let inner = tree.mount_node(Some(outer), In)?;
    tree.mount_listener(Some(inner), spy(&log, &[LifecycleEvent::DidLeave]))?;

    tree.unmount(inner)?;
    assert_eq!(entries(&log), vec!["in->out", "did_leave"]);
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.node(outer)?.listener_count(), 0);
    Ok(())
}

#[test]
fn unmounting_a_leaving_subtree_reports_the_recorded_state() -> Result<()> {
    let recorder = EventRecorder::new();
    let mut tree = TransitionTree::new();
    let outer = tree.mount_node(None, Leaving)?;
    let inner = tree.mount_node(Some(outer), In)?;
    tree.mount_listener(Some(inner), recorder.callbacks("leaf"))?;

    tree.unmount(outer)?;
    assert_eq!(
        recorder.events(),
        vec![
            TransitionEvent::Transition {
                source: "leaf".to_string(),
                prev: Leaving,
                next: Out,
            },
            TransitionEvent::Lifecycle {
                source: "leaf".to_string(),
                event: LifecycleEvent::DidLeave,
            },
        ]
    );
    assert!(tree.is_empty());
    Ok(())
}

#[test]
fn deep_nesting_propagates_in_one_call() -> Result<()> {
    let recorder = EventRecorder::new();
    let mut tree = TransitionTree::new();
    let root = tree.mount_node(None, Out)?;
    let mut parent = root;
    for _ in 0..5 {
        parent = tree.mount_node(Some(parent), In)?;
    }
    tree.mount_listener(Some(parent), recorder.callbacks("leaf"))?;

    tree.set_declared_state(root, Appearing)?;
    assert_eq!(tree.effective_state(parent)?, Appearing);
    assert_eq!(recorder.count(LifecycleEvent::WillAppear), 1);
    assert_eq!(recorder.count(LifecycleEvent::WillComeIn), 1);

    tree.set_declared_state(root, In)?;
    assert_eq!(recorder.count(LifecycleEvent::DidAppear), 1);
    assert_eq!(recorder.count(LifecycleEvent::DidComeIn), 1);
    assert_eq!(recorder.events().iter().filter(|e| e.is_transition()).count(), 2);
    Ok(())
}

#[test]
fn inner_declared_state_dominates_settled_parent() -> Result<()> {
    let log: Log = Rc::default();
    let mut tree = TransitionTree::new();
    let outer = tree.mount_node(None, In)?;
    let inner = tree.mount_node(Some(outer), Entering)?;
    tree.mount_listener(
        Some(inner),
        spy(&log, &[LifecycleEvent::DidEnter, LifecycleEvent::DidComeIn]),
    )?;
    assert!(entries(&log).is_empty());

    tree.set_declared_state(inner, In)?;
    assert_eq!(entries(&log), vec!["entering->in", "did_enter", "did_come_in"]);
    Ok(())
}

#[test]
fn siblings_are_notified_in_mount_order() -> Result<()> {
    let recorder = EventRecorder::new();
    let mut tree = TransitionTree::new();
    let node = tree.mount_node(None, In)?;
    tree.mount_listener(Some(node), recorder.callbacks("first"))?;
    tree.mount_listener(Some(node), recorder.callbacks("second"))?;
    recorder.clear();

    tree.set_declared_state(node, Leaving)?;
    let sources: Vec<String> = recorder
        .events()
        .iter()
        .map(|e| e.to_string())
        .collect();
    assert_eq!(
        sources,
        vec![
            "first: in -> leaving",
            "second: in -> leaving",
            "first: will_leave",
            "second: will_leave",
        ]
    );
    Ok(())
}

#[test]
fn reparenting_a_leaf_switches_its_source() -> Result<()> {
    let recorder = EventRecorder::new();
    let mut tree = TransitionTree::new();
    let a = tree.mount_node(None, In)?;
    let b = tree.mount_node(None, Appearing)?;
    let leaf = tree.mount_listener(Some(a), recorder.callbacks("leaf"))?;
    recorder.clear();

    tree.reparent(leaf, Some(b))?;
    assert!(recorder.is_empty());
    assert_eq!(tree.effective_state(leaf)?, Appearing);

    tree.set_declared_state(a, Leaving)?;
    assert!(recorder.is_empty());

    tree.set_declared_state(b, In)?;
    assert_eq!(recorder.count(LifecycleEvent::DidAppear), 1);
    Ok(())
}

#[test]
fn replacing_callbacks_redirects_later_events() -> Result<()> {
    let recorder = EventRecorder::new();
    let mut tree = TransitionTree::new();
    let node = tree.mount_node(None, Out)?;
    let leaf = tree.mount_listener(Some(node), recorder.callbacks("old"))?;

    tree.set_callbacks(leaf, recorder.callbacks("new"))?;
    assert!(recorder.is_empty());

    tree.set_declared_state(node, Entering)?;
    assert!(recorder.events_for("old").is_empty());
    assert_eq!(recorder.events_for("new").len(), 3);
    Ok(())
}

#[test]
fn render_sees_every_state() -> Result<()> {
    let rendered = Rc::new(RefCell::new(Vec::new()));
    let mut tree = TransitionTree::new();
    let node = tree.mount_node(None, Out)?;
    let leaf = tree.mount_listener(Some(node), Callbacks::new())?;
    {
        let rendered = rendered.clone();
        tree.set_render(leaf, move |state| rendered.borrow_mut().push(state))?;
    }

    for state in [Appearing, In, Leaving, Out] {
        tree.set_declared_state(node, state)?;
    }
    assert_eq!(*rendered.borrow(), vec![Appearing, In, Leaving, Out]);
    assert_eq!(tree.listener(leaf)?.render_count(), 5);
    Ok(())
}
