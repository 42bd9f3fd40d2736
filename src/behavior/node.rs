//! Behavior tree nodes
//!
//! A tree is a plain owned hierarchy of `BehaviorNode`s. Composite and
//! decorator nodes hold their children directly; leaves hold a function
//! pointer that receives the agent state, the shared simulation context and
//! a halt flag. Nothing inside a node points back at the agent, so the same
//! tree type runs for every species.
//!
//! Composite semantics:
//! - `Sequence` / `Fallback` restart from the first child on every tick.
//! - `SequenceStar` / `FallbackStar` resume at the child that last returned
//!   `Running`, so multi-tick leaves are not re-entered from scratch.
//! - Composites halt all of their children once they complete, which makes
//!   any still-running leaf release what it holds.

use std::fmt;

use crate::behavior::blackboard::Blackboard;
use crate::behavior::status::NodeStatus;

/// Leaf callback: `(agent, context, halt) -> status`
///
/// With `halt == true` the callback is being cancelled and should release
/// whatever it holds; its return value is ignored.
pub type LeafFn<A, W> = fn(&mut A, &mut W, bool) -> NodeStatus;

/// Agent state that exposes a blackboard to precondition nodes
pub trait BlackboardHost {
    fn blackboard(&self) -> &Blackboard;
}

pub enum NodeKind<A, W> {
    Sequence,
    /// Resumes at the running child. Stock trees always reset on failure;
    /// `reset_on_failure: false` is opt-in and retries the failing child
    SequenceStar { reset_on_failure: bool },
    Fallback,
    FallbackStar,
    Inverter,
    ForceSuccess,
    ForceFailure,
    /// Succeed after the child succeeded `count` times in a row
    Repeat { count: u32 },
    /// Tick the child up to `attempts` times until it succeeds
    RepeatUntilSuccess { attempts: u32 },
    BlackboardPrecondition { key: String, expected: String },
    Condition(LeafFn<A, W>),
    Action(LeafFn<A, W>),
}

impl<A, W> NodeKind<A, W> {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Sequence => "Sequence",
            NodeKind::SequenceStar { .. } => "SequenceStar",
            NodeKind::Fallback => "Fallback",
            NodeKind::FallbackStar => "FallbackStar",
            NodeKind::Inverter => "Inverter",
            NodeKind::ForceSuccess => "ForceSuccess",
            NodeKind::ForceFailure => "ForceFailure",
            NodeKind::Repeat { .. } => "Repeat",
            NodeKind::RepeatUntilSuccess { .. } => "RepeatUntilSuccess",
            NodeKind::BlackboardPrecondition { .. } => "BlackboardPrecondition",
            NodeKind::Condition(_) => "Condition",
            NodeKind::Action(_) => "Action",
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, NodeKind::Condition(_) | NodeKind::Action(_))
    }
}

impl<A, W> fmt::Debug for NodeKind<A, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::SequenceStar { reset_on_failure } => f
                .debug_struct("SequenceStar")
                .field("reset_on_failure", reset_on_failure)
                .finish(),
            NodeKind::Repeat { count } => f.debug_struct("Repeat").field("count", count).finish(),
            NodeKind::RepeatUntilSuccess { attempts } => f
                .debug_struct("RepeatUntilSuccess")
                .field("attempts", attempts)
                .finish(),
            NodeKind::BlackboardPrecondition { key, expected } => f
                .debug_struct("BlackboardPrecondition")
                .field("key", key)
                .field("expected", expected)
                .finish(),
            other => f.write_str(other.label()),
        }
    }
}

pub struct BehaviorNode<A, W> {
    pub(crate) name: String,
    pub(crate) id: u32,
    pub(crate) kind: NodeKind<A, W>,
    pub(crate) children: Vec<BehaviorNode<A, W>>,
    /// Child index for composites, counter for the repeat decorators
    pub(crate) cursor: u32,
    pub(crate) status: NodeStatus,
}

impl<A, W> fmt::Debug for BehaviorNode<A, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorNode")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("cursor", &self.cursor)
            .field("status", &self.status)
            .field("children", &self.children)
            .finish()
    }
}

impl<A: BlackboardHost, W> BehaviorNode<A, W> {
    pub fn new(name: impl Into<String>, kind: NodeKind<A, W>) -> Self {
        Self {
            name: name.into(),
            id: 0,
            kind,
            children: Vec::new(),
            cursor: 0,
            status: NodeStatus::Idle,
        }
    }

    pub fn with_children(mut self, children: Vec<BehaviorNode<A, W>>) -> Self {
        self.children = children;
        self
    }

    pub fn with_child(mut self, child: BehaviorNode<A, W>) -> Self {
        self.children.push(child);
        self
    }

    pub fn action(name: impl Into<String>, callback: LeafFn<A, W>) -> Self {
        Self::new(name, NodeKind::Action(callback))
    }

    pub fn condition(name: impl Into<String>, callback: LeafFn<A, W>) -> Self {
        Self::new(name, NodeKind::Condition(callback))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn kind(&self) -> &NodeKind<A, W> {
        &self.kind
    }

    pub fn status(&self) -> NodeStatus {
        self.status
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn children(&self) -> &[BehaviorNode<A, W>] {
        &self.children
    }

    /// Number of nodes in this subtree, including self
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }

    /// Depth-first lookup by stable id
    pub fn find(&self, id: u32) -> Option<&BehaviorNode<A, W>> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    /// Assign pre-order ids starting at `next`
    pub(crate) fn assign_ids(&mut self, next: &mut u32) {
        self.id = *next;
        *next += 1;
        for child in &mut self.children {
            child.assign_ids(next);
        }
    }

    pub fn tick(&mut self, agent: &mut A, ctx: &mut W) -> NodeStatus {
        let status = match &self.kind {
            NodeKind::Sequence => self.tick_sequence(agent, ctx),
            NodeKind::SequenceStar { reset_on_failure } => {
                let reset = *reset_on_failure;
                self.tick_sequence_star(agent, ctx, reset)
            }
            NodeKind::Fallback => self.tick_fallback(agent, ctx),
            NodeKind::FallbackStar => self.tick_fallback_star(agent, ctx),
            NodeKind::Inverter => match self.tick_child(agent, ctx) {
                NodeStatus::Success => NodeStatus::Failure,
                NodeStatus::Failure => NodeStatus::Success,
                other => other,
            },
            NodeKind::ForceSuccess => match self.tick_child(agent, ctx) {
                NodeStatus::Running => NodeStatus::Running,
                _ => NodeStatus::Success,
            },
            NodeKind::ForceFailure => match self.tick_child(agent, ctx) {
                NodeStatus::Running => NodeStatus::Running,
                _ => NodeStatus::Failure,
            },
            NodeKind::Repeat { count } => {
                let count = *count;
                self.tick_repeat(agent, ctx, count)
            }
            NodeKind::RepeatUntilSuccess { attempts } => {
                let attempts = *attempts;
                self.tick_repeat_until_success(agent, ctx, attempts)
            }
            NodeKind::BlackboardPrecondition { key, expected } => {
                if agent.blackboard().matches(key, expected) {
                    self.tick_child(agent, ctx)
                } else {
                    NodeStatus::Failure
                }
            }
            NodeKind::Condition(callback) | NodeKind::Action(callback) => {
                callback(agent, ctx, false)
            }
        };
        self.status = status;
        status
    }

    /// Reset this node and everything below it to `Idle`
    ///
    /// Leaves that are currently `Running` get their callback invoked with
    /// the halt flag first. Halting an idle subtree does nothing.
    pub fn halt(&mut self, agent: &mut A, ctx: &mut W) {
        if self.status == NodeStatus::Running {
            if let NodeKind::Condition(callback) | NodeKind::Action(callback) = &self.kind {
                callback(agent, ctx, true);
            }
        }
        self.halt_children(agent, ctx);
        self.cursor = 0;
        self.status = NodeStatus::Idle;
    }

    fn halt_children(&mut self, agent: &mut A, ctx: &mut W) {
        for child in &mut self.children {
            child.halt(agent, ctx);
        }
    }

    fn tick_child(&mut self, agent: &mut A, ctx: &mut W) -> NodeStatus {
        match self.children.first_mut() {
            Some(child) => child.tick(agent, ctx),
            None => NodeStatus::Failure,
        }
    }

    fn tick_sequence(&mut self, agent: &mut A, ctx: &mut W) -> NodeStatus {
        for i in 0..self.children.len() {
            match self.children[i].tick(agent, ctx) {
                NodeStatus::Running => return NodeStatus::Running,
                NodeStatus::Failure => {
                    self.halt_children(agent, ctx);
                    return NodeStatus::Failure;
                }
                _ => {}
            }
        }
        self.halt_children(agent, ctx);
        NodeStatus::Success
    }

    fn tick_sequence_star(&mut self, agent: &mut A, ctx: &mut W, reset_on_failure: bool) -> NodeStatus {
        while (self.cursor as usize) < self.children.len() {
            let index = self.cursor as usize;
            match self.children[index].tick(agent, ctx) {
                NodeStatus::Running => return NodeStatus::Running,
                NodeStatus::Failure => {
                    self.halt_children(agent, ctx);
                    // without reset the failing child is retried next tick
                    self.cursor = if reset_on_failure { 0 } else { index as u32 };
                    return NodeStatus::Failure;
                }
                _ => self.cursor += 1,
            }
        }
        self.cursor = 0;
        self.halt_children(agent, ctx);
        NodeStatus::Success
    }

    fn tick_fallback(&mut self, agent: &mut A, ctx: &mut W) -> NodeStatus {
        for i in 0..self.children.len() {
            match self.children[i].tick(agent, ctx) {
                NodeStatus::Running => return NodeStatus::Running,
                NodeStatus::Success => {
                    self.halt_children(agent, ctx);
                    return NodeStatus::Success;
                }
                _ => {}
            }
        }
        self.halt_children(agent, ctx);
        NodeStatus::Failure
    }

    fn tick_fallback_star(&mut self, agent: &mut A, ctx: &mut W) -> NodeStatus {
        while (self.cursor as usize) < self.children.len() {
            let index = self.cursor as usize;
            match self.children[index].tick(agent, ctx) {
                NodeStatus::Running => return NodeStatus::Running,
                NodeStatus::Success => {
                    self.halt_children(agent, ctx);
                    self.cursor = 0;
                    return NodeStatus::Success;
                }
                _ => self.cursor += 1,
            }
        }
        self.halt_children(agent, ctx);
        self.cursor = 0;
        NodeStatus::Failure
    }

    fn tick_repeat(&mut self, agent: &mut A, ctx: &mut W, count: u32) -> NodeStatus {
        if self.children.is_empty() {
            return NodeStatus::Failure;
        }
        while self.cursor < count {
            match self.children[0].tick(agent, ctx) {
                NodeStatus::Running => return NodeStatus::Running,
                NodeStatus::Failure => {
                    self.cursor = 0;
                    self.halt_children(agent, ctx);
                    return NodeStatus::Failure;
                }
                _ => {
                    self.cursor += 1;
                    self.halt_children(agent, ctx);
                }
            }
        }
        self.cursor = 0;
        NodeStatus::Success
    }

    fn tick_repeat_until_success(&mut self, agent: &mut A, ctx: &mut W, attempts: u32) -> NodeStatus {
        while self.cursor < attempts {
            match self.tick_child(agent, ctx) {
                NodeStatus::Running => return NodeStatus::Running,
                NodeStatus::Success => {
                    self.cursor = 0;
                    return NodeStatus::Success;
                }
                _ => self.cursor += 1,
            }
        }
        self.cursor = 0;
        NodeStatus::Failure
    }
}

/// A built tree with stable node ids
pub struct BehaviorTree<A, W> {
    id: String,
    root: BehaviorNode<A, W>,
}

impl<A, W> fmt::Debug for BehaviorTree<A, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorTree")
            .field("id", &self.id)
            .field("root", &self.root)
            .finish()
    }
}

impl<A: BlackboardHost, W> BehaviorTree<A, W> {
    pub fn new(id: impl Into<String>, mut root: BehaviorNode<A, W>) -> Self {
        let mut next = 0;
        root.assign_ids(&mut next);
        Self {
            id: id.into(),
            root,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> &BehaviorNode<A, W> {
        &self.root
    }

    pub(crate) fn root_mut(&mut self) -> &mut BehaviorNode<A, W> {
        &mut self.root
    }

    pub fn status(&self) -> NodeStatus {
        self.root.status
    }

    pub fn tick(&mut self, agent: &mut A, ctx: &mut W) -> NodeStatus {
        self.root.tick(agent, ctx)
    }

    pub fn halt(&mut self, agent: &mut A, ctx: &mut W) {
        self.root.halt(agent, ctx);
    }

    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }

    pub fn find(&self, id: u32) -> Option<&BehaviorNode<A, W>> {
        self.root.find(id)
    }

    /// First node with the given name in pre-order
    pub fn find_by_name(&self, name: &str) -> Option<&BehaviorNode<A, W>> {
        fn walk<'a, A, W>(node: &'a BehaviorNode<A, W>, name: &str) -> Option<&'a BehaviorNode<A, W>> {
            if node.name == name {
                return Some(node);
            }
            node.children.iter().find_map(|c| walk(c, name))
        }
        walk(&self.root, name)
    }
}
