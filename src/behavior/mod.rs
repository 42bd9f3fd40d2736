//! Behavior trees driving agent decisions
//!
//! Trees are built from JSON definitions by `TreeLibrary`, ticked once per
//! agent per game tick, halted to cancel whatever is running, and
//! snapshotted for save games.

pub mod blackboard;
pub mod factory;
pub mod node;
pub mod snapshot;
pub mod status;

pub use blackboard::{Blackboard, BlackboardValue};
pub use factory::{BehaviorRegistry, DefinitionKind, NodeDefinition, TreeLibrary, MAX_SUBTREE_DEPTH};
pub use node::{BehaviorNode, BehaviorTree, BlackboardHost, LeafFn, NodeKind};
pub use snapshot::{NodeSnapshot, RestoreReport};
pub use status::NodeStatus;
