//! Agents: gnomes, animals, monsters, traders and automatons
//!
//! An agent is its serializable state (`AgentCore`) plus the behavior tree
//! that drives it. The tree's leaves are the functions in `actions` and
//! `conditions`; they receive the core and the shared `Colony`.

pub mod actions;
pub mod claims;
pub mod conditions;
pub mod factory;
pub mod needs;
pub mod persist;
pub mod state;
pub mod tasks;
pub mod tick;

pub use factory::{builtin_registry, AgentFactory, IdAllocator};
pub use needs::{NeedProfile, NeedType, Needs};
pub use persist::AgentSnapshot;
pub use state::{
    Activity, ActivityLog, AgentCore, AgentKind, CarryCounts, CarryPolicy, Cooldowns, Equipment, FuelTank, Movement,
    WorkProgress,
};
pub use tick::TickResult;

use crate::behavior::{BehaviorRegistry, BehaviorTree};
use crate::core::types::{AgentId, Position};
use crate::simulation::Colony;

pub type AgentTree = BehaviorTree<AgentCore, Colony>;
pub type AgentRegistry = BehaviorRegistry<AgentCore, Colony>;

#[derive(Debug)]
pub struct Agent {
    pub core: AgentCore,
    pub tree: AgentTree,
}

impl Agent {
    pub fn id(&self) -> AgentId {
        self.core.id
    }

    pub fn kind(&self) -> AgentKind {
        self.core.kind
    }

    pub fn position(&self) -> Position {
        self.core.position
    }

    pub fn is_dead(&self) -> bool {
        self.core.dead
    }
}
