//! Integration tests for behavior trees
//!
//! These tests drive randomly shaped trees and JSON-defined trees through
//! the public API:
//! - halting releases exactly the running leaves, and only once
//! - snapshots survive a JSON round trip and resume where they left off

use gnome_colony::behavior::{
    BehaviorNode, BehaviorRegistry, BehaviorTree, Blackboard, BlackboardHost, NodeKind, NodeSnapshot, NodeStatus,
    TreeLibrary,
};
use proptest::prelude::*;

#[derive(Default)]
struct Worker {
    bb: Blackboard,
    ticks: u32,
    halts: u32,
    calls: Vec<&'static str>,
}

impl BlackboardHost for Worker {
    fn blackboard(&self) -> &Blackboard {
        &self.bb
    }
}

fn succeed(w: &mut Worker, _: &mut (), halt: bool) -> NodeStatus {
    if halt {
        w.halts += 1;
        return NodeStatus::Idle;
    }
    w.calls.push("succeed");
    NodeStatus::Success
}

fn fail(w: &mut Worker, _: &mut (), halt: bool) -> NodeStatus {
    if halt {
        w.halts += 1;
        return NodeStatus::Idle;
    }
    w.calls.push("fail");
    NodeStatus::Failure
}

fn forever(w: &mut Worker, _: &mut (), halt: bool) -> NodeStatus {
    if halt {
        w.halts += 1;
        return NodeStatus::Idle;
    }
    w.calls.push("forever");
    NodeStatus::Running
}

/// Running twice, then success
fn pulse(w: &mut Worker, _: &mut (), halt: bool) -> NodeStatus {
    if halt {
        w.halts += 1;
        return NodeStatus::Idle;
    }
    w.calls.push("pulse");
    w.ticks += 1;
    if w.ticks % 3 == 0 {
        NodeStatus::Success
    } else {
        NodeStatus::Running
    }
}

#[derive(Debug, Clone)]
enum Shape {
    Leaf(u8),
    Sequence(Vec<Shape>),
    SequenceStar(Vec<Shape>, bool),
    Fallback(Vec<Shape>),
    FallbackStar(Vec<Shape>),
    Inverter(Box<Shape>),
    ForceSuccess(Box<Shape>),
}

fn shape() -> impl Strategy<Value = Shape> {
    let leaf = (0u8..4).prop_map(Shape::Leaf);
    leaf.prop_recursive(4, 40, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(Shape::Sequence),
            (prop::collection::vec(inner.clone(), 1..4), any::<bool>())
                .prop_map(|(children, reset)| Shape::SequenceStar(children, reset)),
            prop::collection::vec(inner.clone(), 1..4).prop_map(Shape::Fallback),
            prop::collection::vec(inner.clone(), 1..4).prop_map(Shape::FallbackStar),
            inner.clone().prop_map(|s| Shape::Inverter(Box::new(s))),
            inner.prop_map(|s| Shape::ForceSuccess(Box::new(s))),
        ]
    })
}

fn build(shape: &Shape) -> BehaviorNode<Worker, ()> {
    let children = |list: &[Shape]| list.iter().map(build).collect::<Vec<_>>();
    match shape {
        Shape::Leaf(0) => BehaviorNode::action("Succeed", succeed),
        Shape::Leaf(1) => BehaviorNode::condition("Fail", fail),
        Shape::Leaf(2) => BehaviorNode::action("Forever", forever),
        Shape::Leaf(_) => BehaviorNode::action("Pulse", pulse),
        Shape::Sequence(list) => BehaviorNode::new("Sequence", NodeKind::Sequence).with_children(children(list)),
        Shape::SequenceStar(list, reset) => BehaviorNode::new(
            "SequenceStar",
            NodeKind::SequenceStar {
                reset_on_failure: *reset,
            },
        )
        .with_children(children(list)),
        Shape::Fallback(list) => BehaviorNode::new("Fallback", NodeKind::Fallback).with_children(children(list)),
        Shape::FallbackStar(list) => {
            BehaviorNode::new("FallbackStar", NodeKind::FallbackStar).with_children(children(list))
        }
        Shape::Inverter(child) => BehaviorNode::new("Inverter", NodeKind::Inverter).with_child(build(child)),
        Shape::ForceSuccess(child) => {
            BehaviorNode::new("ForceSuccess", NodeKind::ForceSuccess).with_child(build(child))
        }
    }
}

fn running_leaves(node: &BehaviorNode<Worker, ()>) -> u32 {
    let own = u32::from(node.kind().is_leaf() && node.status() == NodeStatus::Running);
    own + node.children().iter().map(running_leaves).sum::<u32>()
}

fn all_idle(node: &BehaviorNode<Worker, ()>) -> bool {
    node.status() == NodeStatus::Idle && node.cursor() == 0 && node.children().iter().all(all_idle)
}

proptest! {
    #[test]
    fn test_halt_releases_running_leaves_once(shape in shape(), ticks in 0usize..8) {
        let mut tree = BehaviorTree::new("random", build(&shape));
        let mut worker = Worker::default();
        for _ in 0..ticks {
            tree.tick(&mut worker, &mut ());
        }

        let running = running_leaves(tree.root());
        tree.halt(&mut worker, &mut ());
        prop_assert_eq!(worker.halts, running);
        prop_assert!(all_idle(tree.root()));

        tree.halt(&mut worker, &mut ());
        prop_assert_eq!(worker.halts, running, "second halt must be a no-op");
    }

    #[test]
    fn test_running_tree_has_a_running_leaf(shape in shape(), ticks in 1usize..8) {
        let mut tree = BehaviorTree::new("random", build(&shape));
        let mut worker = Worker::default();
        let mut status = NodeStatus::Idle;
        for _ in 0..ticks {
            status = tree.tick(&mut worker, &mut ());
        }
        if status == NodeStatus::Running {
            prop_assert!(running_leaves(tree.root()) >= 1);
        } else {
            prop_assert!(status.is_done());
        }
    }
}

fn registry() -> BehaviorRegistry<Worker, ()> {
    let mut registry = BehaviorRegistry::new();
    registry.register_action("Succeed", succeed);
    registry.register_action("Pulse", pulse);
    registry.register_condition("Fail", fail);
    registry
}

const PATROL: &str = r#"{
    "trees": {
        "Patrol": {
            "node": "SequenceStar",
            "name": "Patrol",
            "children": [
                { "node": "Action", "id": "Succeed" },
                { "node": "Action", "id": "Pulse", "name": "Walk" },
                { "node": "Action", "id": "Succeed", "name": "Arrive" }
            ]
        }
    }
}"#;

#[test]
fn test_snapshot_round_trip_resumes_mid_sequence() {
    let mut library = TreeLibrary::new();
    library.add_json(PATROL).unwrap();
    let registry = registry();

    let mut tree = library.build("Patrol", &registry).unwrap();
    let mut worker = Worker::default();
    assert_eq!(tree.tick(&mut worker, &mut ()), NodeStatus::Running);
    assert_eq!(tree.root().cursor(), 1);

    let json = serde_json::to_string(&tree.snapshot()).unwrap();
    let saved: NodeSnapshot = serde_json::from_str(&json).unwrap();

    let mut restored = library.build("Patrol", &registry).unwrap();
    let report = restored.restore(&saved);
    assert!(report.is_exact());
    assert_eq!(restored.root().cursor(), 1);

    worker.calls.clear();
    assert_eq!(restored.tick(&mut worker, &mut ()), NodeStatus::Running);
    assert_eq!(restored.tick(&mut worker, &mut ()), NodeStatus::Success);
    assert_eq!(worker.calls, vec!["pulse", "pulse", "succeed"], "first child is not re-run");
}

#[test]
fn test_restore_over_changed_definition_reports_mismatch() {
    let mut library = TreeLibrary::new();
    library.add_json(PATROL).unwrap();
    let registry = registry();
    let mut tree = library.build("Patrol", &registry).unwrap();
    let mut worker = Worker::default();
    tree.tick(&mut worker, &mut ());
    let saved = tree.snapshot();

    let mut changed = TreeLibrary::new();
    changed
        .add_json(
            r#"{ "trees": { "Patrol": {
                "node": "SequenceStar",
                "name": "Patrol",
                "children": [
                    { "node": "Action", "id": "Succeed" },
                    { "node": "Action", "id": "Pulse", "name": "Walk" }
                ]
            } } }"#,
        )
        .unwrap();
    let mut rebuilt = changed.build("Patrol", &registry).unwrap();
    let report = rebuilt.restore(&saved);
    assert!(!report.is_exact());
    assert_eq!(rebuilt.root().cursor(), 1);
}

#[test]
fn test_unknown_leaf_fails_at_build_time() {
    let mut library = TreeLibrary::new();
    library
        .add_json(r#"{ "trees": { "Broken": { "node": "Action", "id": "Teleport" } } }"#)
        .unwrap();
    assert!(library.build("Broken", &registry()).is_err());
}

#[test]
fn test_builtin_trees_resolve_against_agent_leaves() {
    let library = TreeLibrary::builtin().unwrap();
    let registry = gnome_colony::agent::builtin_registry();
    for id in ["Gnome", "Animal", "Monster", "Trader", "Automaton"] {
        let tree = library.build(id, &registry).unwrap();
        assert!(tree.node_count() >= 1, "{} is empty", id);
    }
}

#[test]
fn test_builtin_sequence_stars_reset_on_failure() {
    fn check<A: BlackboardHost, W>(node: &BehaviorNode<A, W>, tree: &str) {
        if let NodeKind::SequenceStar { reset_on_failure } = node.kind() {
            assert!(*reset_on_failure, "{}: {} keeps its cursor on failure", tree, node.name());
        }
        for child in node.children() {
            check(child, tree);
        }
    }
    let library = TreeLibrary::builtin().unwrap();
    let registry = gnome_colony::agent::builtin_registry();
    for id in ["Gnome", "Animal", "Monster", "Trader", "Automaton"] {
        let tree = library.build(id, &registry).unwrap();
        check(tree.root(), id);
    }
}
