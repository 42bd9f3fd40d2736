//! Building behavior trees from data
//!
//! Tree definitions are JSON documents mapping a tree id to a node
//! definition. Leaves refer to actions and conditions by name; the names are
//! resolved against a `BehaviorRegistry` once, when the tree is built, so a
//! typo in a definition fails agent construction instead of a later tick.

use std::collections::BTreeMap;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::behavior::node::{BehaviorNode, BehaviorTree, BlackboardHost, LeafFn, NodeKind};
use crate::core::error::{ColonyError, Result};

/// Subtree references nested deeper than this are rejected
pub const MAX_SUBTREE_DEPTH: usize = 16;

fn default_reset_on_failure() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Display name, defaults to the node kind or the leaf's behavior id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub kind: DefinitionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node")]
pub enum DefinitionKind {
    Sequence {
        children: Vec<NodeDefinition>,
    },
    SequenceStar {
        children: Vec<NodeDefinition>,
        #[serde(default = "default_reset_on_failure")]
        reset_on_failure: bool,
    },
    Fallback {
        children: Vec<NodeDefinition>,
    },
    FallbackStar {
        children: Vec<NodeDefinition>,
    },
    Inverter {
        child: Box<NodeDefinition>,
    },
    ForceSuccess {
        child: Box<NodeDefinition>,
    },
    ForceFailure {
        child: Box<NodeDefinition>,
    },
    Repeat {
        num_cycles: u32,
        child: Box<NodeDefinition>,
    },
    RepeatUntilSuccess {
        num_attempts: u32,
        child: Box<NodeDefinition>,
    },
    BlackboardPrecondition {
        key: String,
        expected: String,
        child: Box<NodeDefinition>,
    },
    Condition {
        id: String,
    },
    Action {
        id: String,
    },
    SubTree {
        id: String,
    },
}

/// Named leaf callbacks, populated once and shared by every tree built from it
pub struct BehaviorRegistry<A, W> {
    actions: AHashMap<String, LeafFn<A, W>>,
    conditions: AHashMap<String, LeafFn<A, W>>,
}

impl<A, W> Default for BehaviorRegistry<A, W> {
    fn default() -> Self {
        Self {
            actions: AHashMap::new(),
            conditions: AHashMap::new(),
        }
    }
}

impl<A, W> BehaviorRegistry<A, W> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_action(&mut self, name: impl Into<String>, callback: LeafFn<A, W>) {
        self.actions.insert(name.into(), callback);
    }

    pub fn register_condition(&mut self, name: impl Into<String>, callback: LeafFn<A, W>) {
        self.conditions.insert(name.into(), callback);
    }

    pub fn action(&self, name: &str) -> Option<LeafFn<A, W>> {
        self.actions.get(name).copied()
    }

    pub fn condition(&self, name: &str) -> Option<LeafFn<A, W>> {
        self.conditions.get(name).copied()
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    pub fn condition_count(&self) -> usize {
        self.conditions.len()
    }
}

/// JSON layout of one behavior file: tree id -> root node
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TreeDocument {
    trees: BTreeMap<String, NodeDefinition>,
}

#[derive(Debug, Clone, Default)]
pub struct TreeLibrary {
    trees: BTreeMap<String, NodeDefinition>,
}

impl TreeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// The trees shipped with the crate
    pub fn builtin() -> Result<Self> {
        let mut library = Self::new();
        library.add_json(include_str!("../../data/behaviors/gnome.json"))?;
        library.add_json(include_str!("../../data/behaviors/animal.json"))?;
        library.add_json(include_str!("../../data/behaviors/monster.json"))?;
        library.add_json(include_str!("../../data/behaviors/automaton.json"))?;
        Ok(library)
    }

    /// Merge a behavior document; later definitions replace earlier ones
    pub fn add_json(&mut self, json: &str) -> Result<()> {
        let doc: TreeDocument = serde_json::from_str(json)?;
        for (id, root) in doc.trees {
            if self.trees.insert(id.clone(), root).is_some() {
                tracing::debug!("Behavior tree '{}' redefined", id);
            }
        }
        Ok(())
    }

    pub fn insert(&mut self, id: impl Into<String>, root: NodeDefinition) {
        self.trees.insert(id.into(), root);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.trees.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.trees.keys().map(|s| s.as_str())
    }

    /// Build a runnable tree, resolving every leaf and subtree reference
    pub fn build<A: BlackboardHost, W>(
        &self,
        id: &str,
        registry: &BehaviorRegistry<A, W>,
    ) -> Result<BehaviorTree<A, W>> {
        let root_def = self
            .trees
            .get(id)
            .ok_or_else(|| ColonyError::UnknownTree(id.to_string()))?;
        let mut stack = vec![id.to_string()];
        let root = self.build_node(root_def, id, registry, &mut stack)?;
        Ok(BehaviorTree::new(id, root))
    }

    fn build_node<A: BlackboardHost, W>(
        &self,
        def: &NodeDefinition,
        tree: &str,
        registry: &BehaviorRegistry<A, W>,
        stack: &mut Vec<String>,
    ) -> Result<BehaviorNode<A, W>> {
        let label = |default: &str| def.name.clone().unwrap_or_else(|| default.to_string());

        let node = match &def.kind {
            DefinitionKind::Sequence { children } => BehaviorNode::new(label("Sequence"), NodeKind::Sequence)
                .with_children(self.build_children(children, tree, registry, stack)?),
            DefinitionKind::SequenceStar {
                children,
                reset_on_failure,
            } => BehaviorNode::new(
                label("SequenceStar"),
                NodeKind::SequenceStar {
                    reset_on_failure: *reset_on_failure,
                },
            )
            .with_children(self.build_children(children, tree, registry, stack)?),
            DefinitionKind::Fallback { children } => BehaviorNode::new(label("Fallback"), NodeKind::Fallback)
                .with_children(self.build_children(children, tree, registry, stack)?),
            DefinitionKind::FallbackStar { children } => {
                BehaviorNode::new(label("FallbackStar"), NodeKind::FallbackStar)
                    .with_children(self.build_children(children, tree, registry, stack)?)
            }
            DefinitionKind::Inverter { child } => BehaviorNode::new(label("Inverter"), NodeKind::Inverter)
                .with_child(self.build_node(child, tree, registry, stack)?),
            DefinitionKind::ForceSuccess { child } => {
                BehaviorNode::new(label("ForceSuccess"), NodeKind::ForceSuccess)
                    .with_child(self.build_node(child, tree, registry, stack)?)
            }
            DefinitionKind::ForceFailure { child } => {
                BehaviorNode::new(label("ForceFailure"), NodeKind::ForceFailure)
                    .with_child(self.build_node(child, tree, registry, stack)?)
            }
            DefinitionKind::Repeat { num_cycles, child } => {
                BehaviorNode::new(label("Repeat"), NodeKind::Repeat { count: *num_cycles })
                    .with_child(self.build_node(child, tree, registry, stack)?)
            }
            DefinitionKind::RepeatUntilSuccess { num_attempts, child } => BehaviorNode::new(
                label("RepeatUntilSuccess"),
                NodeKind::RepeatUntilSuccess {
                    attempts: *num_attempts,
                },
            )
            .with_child(self.build_node(child, tree, registry, stack)?),
            DefinitionKind::BlackboardPrecondition {
                key,
                expected,
                child,
            } => BehaviorNode::new(
                label("BlackboardPrecondition"),
                NodeKind::BlackboardPrecondition {
                    key: key.clone(),
                    expected: expected.clone(),
                },
            )
            .with_child(self.build_node(child, tree, registry, stack)?),
            DefinitionKind::Condition { id } => {
                let callback = registry.condition(id).ok_or_else(|| ColonyError::UnknownBehavior {
                    kind: "condition",
                    name: id.clone(),
                    tree: tree.to_string(),
                })?;
                BehaviorNode::condition(label(id), callback)
            }
            DefinitionKind::Action { id } => {
                let callback = registry.action(id).ok_or_else(|| ColonyError::UnknownBehavior {
                    kind: "action",
                    name: id.clone(),
                    tree: tree.to_string(),
                })?;
                BehaviorNode::action(label(id), callback)
            }
            DefinitionKind::SubTree { id } => {
                if stack.len() >= MAX_SUBTREE_DEPTH || stack.iter().any(|s| s == id) {
                    return Err(ColonyError::SubtreeTooDeep(id.clone()));
                }
                let sub = self.trees.get(id).ok_or_else(|| ColonyError::UnknownBehavior {
                    kind: "subtree",
                    name: id.clone(),
                    tree: tree.to_string(),
                })?;
                stack.push(id.clone());
                let node = self.build_node(sub, id, registry, stack);
                stack.pop();
                let mut node = node?;
                if let Some(name) = &def.name {
                    node.name = name.clone();
                }
                node
            }
        };
        Ok(node)
    }

    fn build_children<A: BlackboardHost, W>(
        &self,
        defs: &[NodeDefinition],
        tree: &str,
        registry: &BehaviorRegistry<A, W>,
        stack: &mut Vec<String>,
    ) -> Result<Vec<BehaviorNode<A, W>>> {
        defs.iter()
            .map(|d| self.build_node(d, tree, registry, stack))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::node::tests::{first, last, slow, Recorder};
    use crate::behavior::NodeStatus;

    fn registry() -> BehaviorRegistry<Recorder, ()> {
        let mut registry = BehaviorRegistry::new();
        registry.register_action("First", first);
        registry.register_action("Slow", slow);
        registry.register_condition("Last", last);
        registry
    }

    const DOC: &str = r#"{
        "trees": {
            "Main": {
                "node": "FallbackStar",
                "children": [
                    { "node": "SubTree", "id": "Work", "name": "DoWork" },
                    { "node": "Condition", "id": "Last" }
                ]
            },
            "Work": {
                "node": "SequenceStar",
                "children": [
                    { "node": "Action", "id": "First" },
                    { "node": "ForceSuccess", "child": { "node": "Action", "id": "Slow" } }
                ]
            }
        }
    }"#;

    #[test]
    fn test_build_from_json_with_subtree() {
        let mut library = TreeLibrary::new();
        library.add_json(DOC).unwrap();
        let mut tree = library.build("Main", &registry()).unwrap();

        assert_eq!(tree.node_count(), 6);
        assert!(tree.find_by_name("DoWork").is_some());

        let mut rec = Recorder::default();
        assert_eq!(tree.tick(&mut rec, &mut ()), NodeStatus::Success);
        assert_eq!(rec.log, vec!["first", "slow"]);
    }

    #[test]
    fn test_unknown_action_fails_at_build() {
        let mut library = TreeLibrary::new();
        library
            .add_json(r#"{ "trees": { "Bad": { "node": "Action", "id": "Teleport" } } }"#)
            .unwrap();
        let err = library.build("Bad", &registry()).unwrap_err();
        assert!(matches!(
            err,
            ColonyError::UnknownBehavior { kind: "action", .. }
        ));
    }

    #[test]
    fn test_unknown_tree() {
        let library = TreeLibrary::new();
        assert!(matches!(
            library.build("Nope", &registry()),
            Err(ColonyError::UnknownTree(_))
        ));
    }

    #[test]
    fn test_subtree_cycle_rejected() {
        let mut library = TreeLibrary::new();
        library
            .add_json(
                r#"{ "trees": {
                    "A": { "node": "Sequence", "children": [ { "node": "SubTree", "id": "B" } ] },
                    "B": { "node": "Sequence", "children": [ { "node": "SubTree", "id": "A" } ] }
                } }"#,
            )
            .unwrap();
        assert!(matches!(
            library.build("A", &registry()),
            Err(ColonyError::SubtreeTooDeep(_))
        ));
    }

    #[test]
    fn test_sequence_star_reset_defaults_to_true() {
        let def: NodeDefinition =
            serde_json::from_str(r#"{ "node": "SequenceStar", "children": [] }"#).unwrap();
        assert_eq!(
            def.kind,
            DefinitionKind::SequenceStar {
                children: vec![],
                reset_on_failure: true
            }
        );
    }
}
